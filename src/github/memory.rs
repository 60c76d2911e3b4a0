//! In-process repository used by tests and offline previews

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use super::{ContentApi, RemoteFile};
use crate::error::{Error, Result};

#[derive(Default)]
struct Files {
    files: BTreeMap<String, RemoteFile>,
    next_version: u64,
    /// Writes that land right after the next read of a path, simulating a
    /// second editor racing between our read and our write
    races: HashMap<String, Vec<String>>,
    commits: Vec<String>,
}

impl Files {
    fn store(&mut self, path: &str, text: &str) -> String {
        self.next_version += 1;
        let sha = format!("{:040x}", self.next_version);
        self.files.insert(
            path.to_string(),
            RemoteFile {
                sha: sha.clone(),
                text: text.to_string(),
            },
        );
        sha
    }
}

/// Repository contents held in memory with the same version-token rules
/// as the hosted API
#[derive(Default)]
pub struct MemoryContent {
    inner: Mutex<Files>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without recording a commit
    pub fn insert(&self, path: &str, text: &str) {
        let mut files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        files.store(path, text);
    }

    /// Current text of a file
    pub fn read(&self, path: &str) -> Option<String> {
        let files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        files.files.get(path).map(|f| f.text.clone())
    }

    /// Paths of all stored files, sorted
    pub fn paths(&self) -> Vec<String> {
        let files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        files.files.keys().cloned().collect()
    }

    /// Commit messages in write order
    pub fn commits(&self) -> Vec<String> {
        let files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        files.commits.clone()
    }

    /// After the next read of `path`, overwrite it with `text` as if
    /// another writer got there first. Queued races apply one per read.
    pub fn race_after_read(&self, path: &str, text: &str) {
        let mut files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        files
            .races
            .entry(path.to_string())
            .or_default()
            .push(text.to_string());
    }
}

impl ContentApi for MemoryContent {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        let mut files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let current = files.files.get(path).cloned();

        let racer = files.races.get_mut(path).and_then(|queue| {
            if queue.is_empty() {
                None
            } else {
                Some(queue.remove(0))
            }
        });
        if let Some(text) = racer {
            files.store(path, &text);
        }

        Ok(current)
    }

    async fn put_file(&self, path: &str, text: &str, message: &str, sha: Option<&str>) -> Result<String> {
        let mut files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let current = files.files.get(path).map(|f| f.sha.clone());

        match (current.as_deref(), sha) {
            (None, _) => {}
            (Some(current), Some(given)) if current == given => {}
            (Some(_), Some(_)) => {
                return Err(Error::Conflict(format!("{} does not match", path)));
            }
            (Some(_), None) => {
                return Err(Error::Conflict(format!("\"sha\" wasn't supplied for {}", path)));
            }
        }

        files.commits.push(message.to_string());
        Ok(files.store(path, text))
    }

    async fn delete_file(&self, path: &str, message: &str) -> Result<()> {
        let mut files = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if files.files.remove(path).is_none() {
            return Err(Error::NotFound(path.to_string()));
        }
        files.commits.push(message.to_string());
        Ok(())
    }
}
