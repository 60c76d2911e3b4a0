//! Content loader - loads posts listed in the index from the published site

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::{sort_newest_first, Post};
use crate::config::BlogConfig;
use crate::error::{Error, Result};
use crate::helpers::join_url;
use crate::index::PostIndex;

/// Where published posts are read from
pub trait PostSource: Send + Sync + 'static {
    /// Fetch the post index; a missing index reads as empty
    fn fetch_index(&self) -> impl Future<Output = Result<PostIndex>> + Send;

    /// Fetch a post file by name, `None` when it does not exist
    fn fetch_post(&self, filename: &str) -> impl Future<Output = Result<Option<String>>> + Send;
}

/// The published static site, read over plain HTTP
pub struct StaticSite {
    http: Client,
    site_url: String,
    index_path: String,
    posts_dir: String,
}

impl StaticSite {
    pub fn new(config: &BlogConfig) -> Result<Self> {
        if config.site_url.trim().is_empty() {
            return Err(Error::Config("site_url is not set".to_string()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            site_url: config.site_url.clone(),
            index_path: config.index_path.clone(),
            posts_dir: config.posts_dir.clone(),
        })
    }

    fn index_url(&self, now: DateTime<Utc>) -> String {
        // The index changes on every publish; defeat intermediate caches
        format!(
            "{}?v={}",
            join_url(&self.site_url, &self.index_path),
            now.timestamp_millis()
        )
    }

    fn post_url(&self, filename: &str) -> String {
        join_url(&self.site_url, &format!("{}/{}", self.posts_dir, filename))
    }
}

impl PostSource for StaticSite {
    async fn fetch_index(&self) -> Result<PostIndex> {
        let resp = self.http.get(self.index_url(Utc::now())).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => {
                tracing::info!("No posts index published yet");
                Ok(PostIndex::default())
            }
            status if status.is_success() => PostIndex::from_json(&resp.text().await?),
            status => Err(Error::Http {
                status: status.as_u16(),
                message: format!("failed to load {}", self.index_path),
            }),
        }
    }

    async fn fetch_post(&self, filename: &str) -> Result<Option<String>> {
        let resp = self.http.get(self.post_url(filename)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!("Post file not found: {} ({})", filename, status.as_u16());
            return Ok(None);
        }
        Ok(Some(resp.text().await?))
    }
}

/// A local checkout of the site repository
pub struct LocalSite {
    base_dir: PathBuf,
    index_path: String,
    posts_dir: String,
}

impl LocalSite {
    pub fn new<P: Into<PathBuf>>(base_dir: P, config: &BlogConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            index_path: config.index_path.clone(),
            posts_dir: config.posts_dir.clone(),
        }
    }
}

impl PostSource for LocalSite {
    async fn fetch_index(&self) -> Result<PostIndex> {
        match tokio::fs::read_to_string(self.base_dir.join(&self.index_path)).await {
            Ok(text) => PostIndex::from_json(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No posts index at {}", self.index_path);
                Ok(PostIndex::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn fetch_post(&self, filename: &str) -> Result<Option<String>> {
        let path = self.base_dir.join(&self.posts_dir).join(filename);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!("Post file not found: {}", filename);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Load every post listed in the index.
///
/// Files are fetched concurrently. Missing or unreadable files are skipped
/// with a warning; the rest are decoded and sorted newest first.
pub async fn load_posts<S: PostSource>(
    source: Arc<S>,
    config: &BlogConfig,
    now: DateTime<Utc>,
) -> Result<Vec<Post>> {
    let index = source.fetch_index().await?;

    let mut tasks = JoinSet::new();
    for (position, filename) in index.posts.into_iter().enumerate() {
        let source = source.clone();
        tasks.spawn(async move {
            let result = source.fetch_post(&filename).await;
            (position, filename, result)
        });
    }

    let mut fetched = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (position, filename, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                tracing::error!("Post fetch task failed: {}", e);
                continue;
            }
        };
        match result {
            Ok(Some(text)) => fetched.push((position, filename, text)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Error loading post {}: {}", filename, e),
        }
    }

    // Restore index order so equal dates keep it after the stable sort
    fetched.sort_by_key(|(position, _, _)| *position);

    let mut posts: Vec<Post> = fetched
        .iter()
        .map(|(_, filename, text)| Post::from_source(filename, text, config, now))
        .collect();
    sort_newest_first(&mut posts);

    tracing::debug!("Loaded {} posts", posts.len());
    Ok(posts)
}
