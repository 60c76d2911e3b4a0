//! View counting

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::config::BlogConfig;
use crate::error::Result;
use crate::realtime::{as_count, validate_key, TreeStore};
use crate::state::LocalState;

const VIEWS_ROOT: &str = "viewCounts";

/// Result of recording a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOutcome {
    /// Count after the visit
    pub count: u64,
    /// Whether this visit incremented the counter
    pub counted: bool,
}

/// Shared view counters in the realtime store.
///
/// A device counts at most one view per post within the dedup window.
/// The window is tracked on the device only.
pub struct ViewCounter<S: TreeStore> {
    store: Arc<S>,
    window: Duration,
}

impl<S: TreeStore + 'static> ViewCounter<S> {
    pub fn new(store: Arc<S>, config: &BlogConfig) -> Self {
        Self {
            store,
            window: config.view_dedup_window(),
        }
    }

    fn path(post_id: &str) -> Result<String> {
        validate_key(post_id)?;
        Ok(format!("{}/{}", VIEWS_ROOT, post_id))
    }

    /// Count a visit unless this device already counted one recently
    pub async fn record_view(
        &self,
        state: &mut LocalState,
        post_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ViewOutcome> {
        if state.is_duplicate_visit(post_id, now, self.window) {
            tracing::debug!("Duplicate visit to {} - not counting", post_id);
            return Ok(ViewOutcome {
                count: self.count(post_id).await?,
                counted: false,
            });
        }

        let committed = self
            .store
            .transaction(&Self::path(post_id)?, |current| json!(as_count(current) + 1))
            .await?;
        state.record_visit(post_id, now);

        let count = as_count(&committed);
        tracing::debug!("View count for {}: {}", post_id, count);
        Ok(ViewOutcome { count, counted: true })
    }

    /// Current count of one post
    pub async fn count(&self, post_id: &str) -> Result<u64> {
        Ok(as_count(&self.store.get(&Self::path(post_id)?).await?))
    }

    /// Counts of several posts, fetched concurrently. Posts whose count
    /// cannot be read report zero.
    pub async fn counts(&self, post_ids: &[String]) -> IndexMap<String, u64> {
        let mut tasks = JoinSet::new();
        for (position, id) in post_ids.iter().cloned().enumerate() {
            let store = self.store.clone();
            tasks.spawn(async move {
                let count = match Self::path(&id) {
                    Ok(path) => store.get(&path).await.map(|v| as_count(&v)),
                    Err(e) => Err(e),
                };
                (position, id, count)
            });
        }

        let mut fetched = Vec::with_capacity(post_ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, id, Ok(count))) => fetched.push((position, id, count)),
                Ok((position, id, Err(e))) => {
                    tracing::warn!("Error getting view count for {}: {}", id, e);
                    fetched.push((position, id, 0));
                }
                Err(e) => tracing::error!("View count task failed: {}", e),
            }
        }

        fetched.sort_by_key(|(position, _, _)| *position);
        fetched.into_iter().map(|(_, id, count)| (id, count)).collect()
    }

    /// Every recorded count
    pub async fn all_counts(&self) -> Result<IndexMap<String, u64>> {
        let node = self.store.get(VIEWS_ROOT).await?;
        Ok(node
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), as_count(v))).collect())
            .unwrap_or_default())
    }
}

/// Counts kept in the local state file, used when no database is
/// configured. Only this device's views are counted.
pub struct LocalViewCounter {
    window: Duration,
}

impl LocalViewCounter {
    pub fn new(config: &BlogConfig) -> Self {
        Self {
            window: config.view_dedup_window(),
        }
    }

    pub fn record_view(&self, state: &mut LocalState, post_id: &str, now: DateTime<Utc>) -> ViewOutcome {
        if state.is_duplicate_visit(post_id, now, self.window) {
            tracing::debug!("Duplicate visit to {} - not counting", post_id);
            return ViewOutcome {
                count: self.count(state, post_id),
                counted: false,
            };
        }

        let count = state.local_views.entry(post_id.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        state.record_visit(post_id, now);
        ViewOutcome { count, counted: true }
    }

    pub fn count(&self, state: &LocalState, post_id: &str) -> u64 {
        state.local_views.get(post_id).copied().unwrap_or(0)
    }
}
