//! Likes

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::realtime::{as_count, validate_key, Subscription, TreeStore};

/// Like status of a post as seen from this device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub liked: bool,
    pub count: u64,
}

impl LikeState {
    fn from_node(node: &Value, device_id: &str) -> Self {
        Self {
            liked: node["users"][device_id] == Value::Bool(true),
            count: as_count(&node["count"]),
        }
    }
}

/// Per-device likes stored under `likes/{postId}`: a membership flag per
/// device and a shared counter
pub struct Likes<S: TreeStore> {
    store: Arc<S>,
    device_id: String,
}

impl<S: TreeStore> Likes<S> {
    pub fn new(store: Arc<S>, device_id: impl Into<String>) -> Self {
        Self {
            store,
            device_id: device_id.into(),
        }
    }

    fn node(post_id: &str) -> Result<String> {
        validate_key(post_id)?;
        Ok(format!("likes/{}", post_id))
    }

    /// Like the post, or take the like back if this device already liked it
    pub async fn toggle(&self, post_id: &str) -> Result<LikeState> {
        let node = Self::node(post_id)?;
        let member = format!("{}/users/{}", node, self.device_id);
        let count = format!("{}/count", node);

        let liked = self.store.get(&member).await? == Value::Bool(true);
        if liked {
            self.store.remove(&member).await?;
            self.store
                .transaction(&count, |current| json!(as_count(current).saturating_sub(1)))
                .await?;
        } else {
            self.store.set(&member, Value::Bool(true)).await?;
            self.store
                .transaction(&count, |current| json!(as_count(current) + 1))
                .await?;
        }

        let state = LikeState {
            liked: !liked,
            count: as_count(&self.store.get(&count).await?),
        };
        tracing::debug!("Like on {} is now {:?}", post_id, state);
        Ok(state)
    }

    pub async fn status(&self, post_id: &str) -> Result<LikeState> {
        let node = self.store.get(&Self::node(post_id)?).await?;
        Ok(LikeState::from_node(&node, &self.device_id))
    }

    /// Follow the like state until the watch is dropped
    pub async fn watch(&self, post_id: &str) -> Result<LikeWatch> {
        let subscription = self.store.subscribe(&Self::node(post_id)?).await?;
        Ok(LikeWatch {
            subscription,
            device_id: self.device_id.clone(),
        })
    }
}

/// Live like state of one post
pub struct LikeWatch {
    subscription: Subscription,
    device_id: String,
}

impl LikeWatch {
    /// The state after the next change; `None` once the stream closed
    pub async fn next(&mut self) -> Option<LikeState> {
        let node = self.subscription.next().await?;
        Some(LikeState::from_node(&node, &self.device_id))
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}
