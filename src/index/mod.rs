//! Post index document
//!
//! `data/posts-index.json` lists post filenames, most recent first:
//!
//! ```json
//! { "posts": ["2024-01-15-hello.md", "2024-01-10-older.md"] }
//! ```
//!
//! Updates are read-modify-write cycles guarded by the document's version
//! token. A cycle that loses against a concurrent writer re-reads the
//! index and reapplies its change.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::github::ContentApi;

/// The decoded index document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostIndex {
    #[serde(default)]
    pub posts: Vec<String>,
}

/// A change to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOp {
    /// Put a new post at the front
    Add(String),
    /// Rename an entry in place; prepend when `old` is not listed
    Replace { old: String, new: String },
    /// Drop every entry with this filename
    Remove(String),
}

impl IndexOp {
    fn action(&self) -> &'static str {
        match self {
            IndexOp::Add(_) => "add",
            IndexOp::Replace { .. } => "update",
            IndexOp::Remove(_) => "delete",
        }
    }

    fn filename(&self) -> &str {
        match self {
            IndexOp::Add(f) | IndexOp::Remove(f) => f,
            IndexOp::Replace { new, .. } => new,
        }
    }
}

impl PostIndex {
    /// Decode the JSON document
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply a change in place. Filenames stay unique; returns whether the
    /// list changed.
    pub fn apply(&mut self, op: &IndexOp) -> bool {
        let before = self.posts.clone();
        match op {
            IndexOp::Add(filename) => self.prepend(filename),
            IndexOp::Replace { old, new } => match self.posts.iter().position(|p| p == old) {
                Some(pos) => {
                    self.posts[pos] = new.clone();
                    let mut seen = false;
                    self.posts.retain(|p| p != new || !std::mem::replace(&mut seen, true));
                }
                None => self.prepend(new),
            },
            IndexOp::Remove(filename) => self.posts.retain(|p| p != filename),
        }
        self.posts != before
    }

    fn prepend(&mut self, filename: &str) {
        if !self.posts.iter().any(|p| p == filename) {
            self.posts.insert(0, filename.to_string());
        }
    }
}

/// Applies changes to the index file stored in the repository
pub struct IndexSync<'a, C: ContentApi> {
    api: &'a C,
    path: &'a str,
    retry_limit: usize,
}

impl<'a, C: ContentApi> IndexSync<'a, C> {
    pub fn new(api: &'a C, path: &'a str, retry_limit: usize) -> Self {
        Self {
            api,
            path,
            retry_limit: retry_limit.max(1),
        }
    }

    /// Fetch the current index; a missing file reads as empty
    pub async fn read(&self) -> Result<PostIndex> {
        match self.api.get_file(self.path).await? {
            Some(file) => PostIndex::from_json(&file.text),
            None => Ok(PostIndex::default()),
        }
    }

    /// Apply `op` with a conditional write, retrying on version conflicts
    pub async fn update(&self, op: &IndexOp) -> Result<PostIndex> {
        let message = format!("Update posts index: {} {}", op.action(), op.filename());

        for attempt in 1..=self.retry_limit {
            let current = self.api.get_file(self.path).await?;
            let (mut index, sha) = match current {
                Some(file) => (PostIndex::from_json(&file.text)?, Some(file.sha)),
                None => (PostIndex::default(), None),
            };

            if !index.apply(op) {
                tracing::debug!("Index already up to date for {}", op.filename());
                return Ok(index);
            }

            match self
                .api
                .put_file(self.path, &index.to_json()?, &message, sha.as_deref())
                .await
            {
                Ok(_) => return Ok(index),
                Err(e) if e.is_conflict() => {
                    tracing::warn!(
                        "Index changed during update (attempt {}/{}): {}",
                        attempt,
                        self.retry_limit,
                        e
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::Conflict(format!(
            "{} kept changing; gave up after {} attempts",
            self.path, self.retry_limit
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MemoryContent;

    const PATH: &str = "data/posts-index.json";

    fn index(posts: &[&str]) -> PostIndex {
        PostIndex {
            posts: posts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_apply_ops() {
        let mut idx = index(&["b.md", "a.md"]);
        idx.apply(&IndexOp::Add("c.md".into()));
        assert_eq!(idx, index(&["c.md", "b.md", "a.md"]));

        idx.apply(&IndexOp::Replace {
            old: "b.md".into(),
            new: "b2.md".into(),
        });
        assert_eq!(idx, index(&["c.md", "b2.md", "a.md"]));

        idx.apply(&IndexOp::Replace {
            old: "missing.md".into(),
            new: "d.md".into(),
        });
        assert_eq!(idx, index(&["d.md", "c.md", "b2.md", "a.md"]));

        idx.apply(&IndexOp::Remove("c.md".into()));
        assert_eq!(idx, index(&["d.md", "b2.md", "a.md"]));
    }

    #[test]
    fn test_apply_keeps_filenames_unique() {
        let mut idx = index(&["b.md", "a.md"]);
        assert!(!idx.apply(&IndexOp::Add("a.md".into())));
        assert_eq!(idx, index(&["b.md", "a.md"]));

        assert!(idx.apply(&IndexOp::Replace {
            old: "b.md".into(),
            new: "a.md".into(),
        }));
        assert_eq!(idx, index(&["a.md"]));

        assert!(!idx.apply(&IndexOp::Remove("zzz.md".into())));
    }

    #[test]
    fn test_json_shape() {
        let idx = PostIndex::from_json(r#"{"posts": ["a.md"]}"#).unwrap();
        assert_eq!(idx, index(&["a.md"]));
        assert_eq!(PostIndex::from_json("{}").unwrap(), PostIndex::default());
        assert!(idx.to_json().unwrap().contains("\"posts\": ["));
    }

    #[tokio::test]
    async fn test_update_creates_missing_index() {
        let repo = MemoryContent::new();
        let sync = IndexSync::new(&repo, PATH, 3);
        sync.update(&IndexOp::Add("a.md".into())).await.unwrap();
        assert_eq!(sync.read().await.unwrap(), index(&["a.md"]));
        assert_eq!(repo.commits(), vec!["Update posts index: add a.md"]);
    }

    #[tokio::test]
    async fn test_update_retries_and_keeps_concurrent_change() {
        let repo = MemoryContent::new();
        repo.insert(PATH, &index(&["a.md"]).to_json().unwrap());
        // Another editor adds b.md between our read and our write
        repo.race_after_read(PATH, &index(&["b.md", "a.md"]).to_json().unwrap());

        let sync = IndexSync::new(&repo, PATH, 3);
        let result = sync.update(&IndexOp::Add("c.md".into())).await.unwrap();

        assert_eq!(result, index(&["c.md", "b.md", "a.md"]));
        assert_eq!(sync.read().await.unwrap(), result);
    }

    #[tokio::test]
    async fn test_update_gives_up_after_limit() {
        let repo = MemoryContent::new();
        repo.insert(PATH, &index(&[]).to_json().unwrap());
        for i in 0..2 {
            repo.race_after_read(PATH, &index(&[&format!("r{}.md", i)]).to_json().unwrap());
        }

        let sync = IndexSync::new(&repo, PATH, 2);
        let err = sync.update(&IndexOp::Add("c.md".into())).await.unwrap_err();
        assert!(err.is_conflict());
    }
}
