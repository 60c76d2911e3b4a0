//! GitHub repository contents
//!
//! Files are read, written and deleted one path at a time. Every existing
//! file carries a version token (its blob SHA); writing over an existing
//! file or deleting it requires the token seen on the last read.

mod client;
mod memory;

pub use client::GitHubClient;
pub use memory::MemoryContent;

use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::error::Result;

/// A file fetched from the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Version token required by conditional writes
    pub sha: String,
    /// Decoded UTF-8 content
    pub text: String,
}

/// The authenticated account, as returned by `GET /user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// File-level access to a repository
pub trait ContentApi: Send + Sync {
    /// Fetch a file, `None` when it does not exist
    fn get_file(&self, path: &str) -> impl Future<Output = Result<Option<RemoteFile>>> + Send;

    /// Create or overwrite a file and return its new version token.
    /// `sha` must be the current token when the file exists; a stale or
    /// missing token fails with `Error::Conflict`.
    fn put_file(
        &self,
        path: &str,
        text: &str,
        message: &str,
        sha: Option<&str>,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Delete a file. Fails with `Error::NotFound` when it is already gone.
    fn delete_file(&self, path: &str, message: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Write a file regardless of its current version (last writer wins)
pub async fn write_file<C: ContentApi>(api: &C, path: &str, text: &str, message: &str) -> Result<String> {
    let sha = api.get_file(path).await?.map(|f| f.sha);
    api.put_file(path, text, message, sha.as_deref()).await
}
