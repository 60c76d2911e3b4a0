//! In-process tree store used by tests

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{resolve_server_values, segments, set_at, sort_children, value_at, Subscription, TreeStore};
use crate::error::Result;

struct Watcher {
    path: Vec<String>,
    tx: mpsc::UnboundedSender<Value>,
}

#[derive(Default)]
struct Tree {
    root: Value,
    watchers: Vec<Watcher>,
}

impl Tree {
    fn write(&mut self, path: &str, value: Value) {
        let segs = segments(path);
        set_at(&mut self.root, &segs, value);
        self.notify(&segs);
    }

    /// Push the new value to every watcher on, above or below `changed`
    fn notify(&mut self, changed: &[&str]) {
        let root = &self.root;
        self.watchers.retain(|w| {
            let related = w
                .path
                .iter()
                .zip(changed.iter())
                .all(|(a, b)| a.as_str() == *b);
            if !related {
                return !w.tx.is_closed();
            }
            let segs: Vec<&str> = w.path.iter().map(String::as_str).collect();
            w.tx.send(value_at(root, &segs).clone()).is_ok()
        });
    }
}

/// Tree store held in memory. Server timestamps come from a clock that
/// starts at the wall clock and advances by one millisecond per use, so
/// consecutive writes get distinct, increasing timestamps.
pub struct MemoryTree {
    tree: Mutex<Tree>,
    clock: AtomicI64,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::with_clock(chrono::Utc::now().timestamp_millis())
    }

    /// Start the server clock at `start_ms`
    pub fn with_clock(start_ms: i64) -> Self {
        Self {
            tree: Mutex::new(Tree::default()),
            clock: AtomicI64::new(start_ms),
        }
    }

    fn tick(&self) -> i64 {
        self.clock.fetch_add(1, Ordering::SeqCst)
    }

    /// Snapshot of the whole tree
    pub fn snapshot(&self) -> Value {
        self.lock().root.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TreeStore for MemoryTree {
    async fn get(&self, path: &str) -> Result<Value> {
        let tree = self.lock();
        Ok(value_at(&tree.root, &segments(path)).clone())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let value = resolve_server_values(value, self.tick());
        self.lock().write(path, value);
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let now = self.tick();
        let mut tree = self.lock();
        let base = segments(path);
        for (key, value) in fields {
            let mut child = base.clone();
            child.extend(segments(&key));
            set_at(&mut tree.root, &child, resolve_server_values(value, now));
        }
        // Watchers see the whole update at once
        tree.notify(&base);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.lock().write(path, Value::Null);
        Ok(())
    }

    async fn children_ordered_by(&self, path: &str, field: &str) -> Result<Vec<(String, Value)>> {
        let tree = self.lock();
        Ok(sort_children(value_at(&tree.root, &segments(path)), field))
    }

    async fn transaction<F>(&self, path: &str, apply: F) -> Result<Value>
    where
        F: Fn(&Value) -> Value + Send + Sync,
    {
        let now = self.tick();
        let mut tree = self.lock();
        let current = value_at(&tree.root, &segments(path)).clone();
        let next = resolve_server_values(apply(&current), now);
        tree.write(path, next.clone());
        Ok(next)
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tree = self.lock();
        let segs = segments(path);
        // Ignoring the error: the receiver is still in scope
        let _ = tx.send(value_at(&tree.root, &segs).clone());
        tree.watchers.push(Watcher {
            path: segs.iter().map(|s| s.to_string()).collect(),
            tx,
        });
        Ok(Subscription::new(rx, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_set_remove() {
        let tree = MemoryTree::new();
        assert!(tree.get("viewCounts/p1").await.unwrap().is_null());

        tree.set("viewCounts/p1", json!(3)).await.unwrap();
        assert_eq!(tree.get("viewCounts/p1").await.unwrap(), json!(3));
        assert_eq!(tree.get("viewCounts").await.unwrap(), json!({ "p1": 3 }));

        tree.remove("viewCounts/p1").await.unwrap();
        assert!(tree.get("viewCounts").await.unwrap().is_null());
    }

    #[tokio::test]
    async fn test_update_merges_and_resolves_timestamp() {
        let tree = MemoryTree::with_clock(1_000);
        tree.set("c/p/k", json!({ "text": "a", "edited": false })).await.unwrap();

        let mut fields = Map::new();
        fields.insert("text".into(), json!("b"));
        fields.insert("editedAt".into(), super::super::server_timestamp());
        tree.update("c/p/k", fields).await.unwrap();

        let node = tree.get("c/p/k").await.unwrap();
        assert_eq!(node["text"], json!("b"));
        assert_eq!(node["edited"], json!(false));
        assert_eq!(node["editedAt"], json!(1_001));
    }

    #[tokio::test]
    async fn test_transaction_is_atomic_under_concurrency() {
        let tree = std::sync::Arc::new(MemoryTree::new());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let tree = tree.clone();
            handles.push(tokio::spawn(async move {
                tree.transaction("viewCounts/p", |v| json!(super::super::as_count(v) + 1))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(tree.get("viewCounts/p").await.unwrap(), json!(50));
    }

    #[tokio::test]
    async fn test_subscribe_receives_initial_and_changes() {
        let tree = MemoryTree::new();
        tree.set("likes/p/count", json!(1)).await.unwrap();

        let mut sub = tree.subscribe("likes/p").await.unwrap();
        assert_eq!(sub.next().await, Some(json!({ "count": 1 })));

        tree.set("likes/p/count", json!(2)).await.unwrap();
        assert_eq!(sub.next().await, Some(json!({ "count": 2 })));

        // Unrelated paths do not wake the subscriber
        tree.set("likes/other/count", json!(9)).await.unwrap();
        tree.remove("likes").await.unwrap();
        assert_eq!(sub.next().await, Some(Value::Null));

        sub.unsubscribe();
        tree.set("likes/p/count", json!(3)).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_notifies_once_with_all_fields() {
        let tree = MemoryTree::new();
        tree.set("comments/p/k", json!({ "text": "a", "edited": false })).await.unwrap();

        let mut sub = tree.subscribe("comments/p").await.unwrap();
        sub.next().await.unwrap();

        let mut fields = Map::new();
        fields.insert("text".into(), json!("b"));
        fields.insert("edited".into(), json!(true));
        tree.update("comments/p/k", fields).await.unwrap();

        assert_eq!(
            sub.next().await,
            Some(json!({ "k": { "text": "b", "edited": true } }))
        );
        tree.set("comments/p/k/text", json!("c")).await.unwrap();
        assert_eq!(sub.next().await.unwrap()["k"]["text"], json!("c"));
    }
}
