//! Realtime tree store
//!
//! A JSON tree addressed by slash-separated paths such as
//! `likes/{postId}/count`. An absent node reads as `null`, writing `null`
//! removes it, and empty parents disappear with their last child.
//! Numeric counters are updated through `transaction`, which is atomic
//! with respect to every other writer of the same node.

mod memory;
mod rest;

pub use memory::MemoryTree;
pub use rest::RestTree;

use rand::Rng;
use serde_json::{json, Map, Value};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};

/// Placeholder the store replaces with its own clock (milliseconds)
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

/// Operations offered by the realtime store
pub trait TreeStore: Send + Sync {
    /// Read a node; `Value::Null` when absent
    fn get(&self, path: &str) -> impl Future<Output = Result<Value>> + Send;

    /// Replace a node
    fn set(&self, path: &str, value: Value) -> impl Future<Output = Result<()>> + Send;

    /// Merge the given children into a node
    fn update(&self, path: &str, fields: Map<String, Value>) -> impl Future<Output = Result<()>> + Send;

    /// Delete a node
    fn remove(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Children of a node sorted ascending by one of their fields.
    /// Children missing the field sort first.
    fn children_ordered_by(
        &self,
        path: &str,
        field: &str,
    ) -> impl Future<Output = Result<Vec<(String, Value)>>> + Send;

    /// Atomically replace a node with `apply(current)` and return the
    /// committed value
    fn transaction<F>(&self, path: &str, apply: F) -> impl Future<Output = Result<Value>> + Send
    where
        F: Fn(&Value) -> Value + Send + Sync;

    /// Receive the node's value now and after every change until the
    /// subscription is dropped
    fn subscribe(&self, path: &str) -> impl Future<Output = Result<Subscription>> + Send;
}

/// A live view of one node
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Value>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<Value>, task: Option<JoinHandle<()>>) -> Self {
        Self { rx, task }
    }

    /// Wait for the next value. `None` once the store closed the stream.
    pub async fn next(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Stop receiving updates
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Reject keys the store cannot address
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['.', '#', '$', '[', ']', '/']) {
        return Err(Error::Validation(format!("invalid database key: {:?}", key)));
    }
    Ok(())
}

const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// Generate a 20-character, chronologically sortable child key
pub fn push_id(now_ms: i64) -> String {
    let mut key = String::with_capacity(20);

    let mut ts = now_ms.max(0) as u64;
    let mut prefix = [0u8; 8];
    for slot in prefix.iter_mut().rev() {
        *slot = PUSH_CHARS[(ts % 64) as usize];
        ts /= 64;
    }
    key.extend(prefix.iter().map(|&b| b as char));

    let mut rng = rand::thread_rng();
    for _ in 0..12 {
        key.push(PUSH_CHARS[rng.gen_range(0..64)] as char);
    }
    key
}

pub(crate) fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub(crate) fn value_at<'v>(root: &'v Value, segs: &[&str]) -> &'v Value {
    static NULL: Value = Value::Null;
    let mut node = root;
    for seg in segs {
        match node.get(*seg) {
            Some(child) => node = child,
            None => return &NULL,
        }
    }
    node
}

fn is_empty_node(v: &Value) -> bool {
    v.is_null() || v.as_object().is_some_and(|m| m.is_empty())
}

/// Write `value` at `segs`, pruning nodes left empty
pub(crate) fn set_at(node: &mut Value, segs: &[&str], value: Value) {
    let Some((head, rest)) = segs.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        let emptied = {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_at(child, rest, value);
            is_empty_node(child)
        };
        if emptied {
            map.remove(*head);
        }
    }
}

/// Replace server value placeholders with `now_ms`
pub(crate) fn resolve_server_values(value: Value, now_ms: i64) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp") {
                return json!(now_ms);
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, resolve_server_values(v, now_ms)))
                    .collect(),
            )
        }
        other => other,
    }
}

/// Sort children by a numeric or string field, absent values first
pub(crate) fn sort_children(node: &Value, field: &str) -> Vec<(String, Value)> {
    let mut children: Vec<(String, Value)> = node
        .as_object()
        .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    children.sort_by(|(ka, a), (kb, b)| {
        let (fa, fb) = (a.get(field), b.get(field));
        let order = match (fa, fb) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(x), Some(y)) => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                _ => x.to_string().cmp(&y.to_string()),
            },
        };
        order.then_with(|| ka.cmp(kb))
    });
    children
}

/// Read a counter node, treating absent or malformed values as zero
pub fn as_count(value: &Value) -> u64 {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
        .unwrap_or(0)
}
