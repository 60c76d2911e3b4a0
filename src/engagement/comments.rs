//! Comments
//!
//! Stored under `comments/{postId}/{key}` with push-generated keys.
//! Ownership is the device ID written with the comment and is checked on
//! this side only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::BlogConfig;
use crate::error::{Error, Result};
use crate::realtime::{push_id, server_timestamp, validate_key, Subscription, TreeStore};

const DEFAULT_AUTHOR: &str = "Anonymous";

/// A stored comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub user_id: String,
    /// Server time in milliseconds; absent until the server resolves it
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
    /// Whether this device wrote the comment
    #[serde(skip)]
    pub is_own: bool,
}

pub struct Comments<S: TreeStore> {
    store: Arc<S>,
    device_id: String,
    max_len: usize,
}

impl<S: TreeStore> Comments<S> {
    pub fn new(store: Arc<S>, device_id: impl Into<String>, config: &BlogConfig) -> Self {
        Self {
            store,
            device_id: device_id.into(),
            max_len: config.comment_max_len,
        }
    }

    fn node(post_id: &str) -> Result<String> {
        validate_key(post_id)?;
        Ok(format!("comments/{}", post_id))
    }

    fn entry(post_id: &str, comment_id: &str) -> Result<String> {
        validate_key(comment_id)?;
        Ok(format!("{}/{}", Self::node(post_id)?, comment_id))
    }

    fn validate_text(&self, text: &str) -> Result<String> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::Validation("Please enter a comment".to_string()));
        }
        if text.chars().count() > self.max_len {
            return Err(Error::Validation(format!(
                "Comments are limited to {} characters",
                self.max_len
            )));
        }
        Ok(text.to_string())
    }

    fn check_owner(&self, owner: &str, action: &str) -> Result<()> {
        if owner != self.device_id {
            tracing::warn!("Cannot {} comment: not the owner", action);
            return Err(Error::Unauthorized(format!("only the author can {} this comment", action)));
        }
        Ok(())
    }

    /// Add a comment and return it as stored
    pub async fn add(&self, post_id: &str, text: &str, author: Option<&str>, now: DateTime<Utc>) -> Result<Comment> {
        let text = self.validate_text(text)?;
        let author = author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AUTHOR);

        let key = push_id(now.timestamp_millis());
        let path = Self::entry(post_id, &key)?;

        let comment = Comment {
            id: key.clone(),
            text,
            author: author.to_string(),
            user_id: self.device_id.clone(),
            timestamp: None,
            edited: false,
            edited_at: None,
            is_own: true,
        };
        let mut value = serde_json::to_value(&comment)?;
        value["timestamp"] = server_timestamp();
        self.store.set(&path, value).await?;

        // Read back for the resolved timestamp
        let stored = self.store.get(&path).await?;
        Ok(self.decode(&key, stored).unwrap_or(comment))
    }

    /// Comments on a post, newest first
    pub async fn list(&self, post_id: &str) -> Result<Vec<Comment>> {
        let children = self
            .store
            .children_ordered_by(&Self::node(post_id)?, "timestamp")
            .await?;
        let mut comments: Vec<Comment> = children
            .into_iter()
            .filter_map(|(key, value)| self.decode(&key, value))
            .collect();
        comments.reverse();
        Ok(comments)
    }

    pub async fn count(&self, post_id: &str) -> Result<usize> {
        let node = self.store.get(&Self::node(post_id)?).await?;
        Ok(node.as_object().map_or(0, Map::len))
    }

    /// Replace the text of a comment owned by `owner`
    pub async fn edit(&self, post_id: &str, comment_id: &str, owner: &str, text: &str) -> Result<()> {
        self.check_owner(owner, "edit")?;
        let text = self.validate_text(text)?;
        let path = Self::entry(post_id, comment_id)?;

        if self.store.get(&path).await?.is_null() {
            return Err(Error::NotFound(format!("comment {}", comment_id)));
        }

        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::String(text));
        fields.insert("edited".to_string(), Value::Bool(true));
        fields.insert("editedAt".to_string(), server_timestamp());
        self.store.update(&path, fields).await
    }

    /// Delete a comment owned by `owner`. Deleting a comment that is
    /// already gone succeeds.
    pub async fn delete(&self, post_id: &str, comment_id: &str, owner: &str) -> Result<()> {
        self.check_owner(owner, "delete")?;
        self.store.remove(&Self::entry(post_id, comment_id)?).await
    }

    /// Follow the comment list until the watch is dropped
    pub async fn watch(&self, post_id: &str) -> Result<CommentWatch> {
        let subscription = self.store.subscribe(&Self::node(post_id)?).await?;
        Ok(CommentWatch {
            subscription,
            device_id: self.device_id.clone(),
        })
    }

    fn decode(&self, key: &str, value: Value) -> Option<Comment> {
        decode_comment(key, value, &self.device_id)
    }
}

fn decode_comment(key: &str, value: Value, device_id: &str) -> Option<Comment> {
    match serde_json::from_value::<Comment>(value) {
        Ok(mut comment) => {
            comment.id = key.to_string();
            comment.is_own = comment.user_id == device_id;
            Some(comment)
        }
        Err(e) => {
            tracing::warn!("Skipping malformed comment {}: {}", key, e);
            None
        }
    }
}

/// Live comment list of one post
pub struct CommentWatch {
    subscription: Subscription,
    device_id: String,
}

impl CommentWatch {
    /// The list after the next change, newest first
    pub async fn next(&mut self) -> Option<Vec<Comment>> {
        let node = self.subscription.next().await?;
        let mut comments: Vec<Comment> = node
            .as_object()
            .map(|m| {
                m.iter()
                    .filter_map(|(k, v)| decode_comment(k, v.clone(), &self.device_id))
                    .collect()
            })
            .unwrap_or_default();
        comments.sort_by(|a, b| b.timestamp.unwrap_or(0).cmp(&a.timestamp.unwrap_or(0)));
        Some(comments)
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
