//! Realtime database reached over its REST interface

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;

use super::{segments, set_at, sort_children, Subscription, TreeStore};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::helpers::encode_path;

/// Give up on a contended transaction after this many rounds
const MAX_TRANSACTION_ATTEMPTS: usize = 25;

/// REST client for a hosted realtime database
#[derive(Clone)]
pub struct RestTree {
    http: Client,
    /// No overall timeout: event streams stay open indefinitely
    stream_http: Client,
    base_url: String,
    auth: Option<String>,
}

#[derive(Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

impl RestTree {
    pub fn new(config: &DatabaseConfig, timeout: Duration) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(Error::Config("database.url is not set".to_string()));
        }
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            stream_http: Client::builder().connect_timeout(timeout).build()?,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth: config.auth.clone().filter(|a| !a.is_empty()),
        })
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, encode_path(path))
    }

    fn request(&self, client: &Client, method: Method, path: &str) -> RequestBuilder {
        let builder = client.request(method, self.node_url(path));
        match &self.auth {
            Some(auth) => builder.query(&[("auth", auth.as_str())]),
            None => builder,
        }
    }

    async fn send_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let mut req = self.request(&self.http, method, path);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = check(req.send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Read a node together with its ETag
    async fn get_with_etag(&self, path: &str) -> Result<(Value, String)> {
        let resp = self
            .request(&self.http, Method::GET, path)
            .header("X-Firebase-ETag", "true")
            .send()
            .await?;
        let resp = check(resp).await?;
        let etag = etag_of(&resp)?;
        Ok((resp.json().await?, etag))
    }
}

impl TreeStore for RestTree {
    async fn get(&self, path: &str) -> Result<Value> {
        self.send_json(Method::GET, path, None).await
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.send_json(Method::PUT, path, Some(&value)).await?;
        Ok(())
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        self.send_json(Method::PATCH, path, Some(&Value::Object(fields)))
            .await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        self.send_json(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn children_ordered_by(&self, path: &str, field: &str) -> Result<Vec<(String, Value)>> {
        // Sorting locally avoids depending on an `.indexOn` rule
        let node = self.get(path).await?;
        Ok(sort_children(&node, field))
    }

    async fn transaction<F>(&self, path: &str, apply: F) -> Result<Value>
    where
        F: Fn(&Value) -> Value + Send + Sync,
    {
        let (mut current, mut etag) = self.get_with_etag(path).await?;

        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            let next = apply(&current);
            let resp = self
                .request(&self.http, Method::PUT, path)
                .header(header::IF_MATCH, etag.as_str())
                .json(&next)
                .send()
                .await?;

            if resp.status() == StatusCode::PRECONDITION_FAILED {
                tracing::debug!("Transaction on {} retried (attempt {})", path, attempt);
                etag = etag_of(&resp)?;
                current = resp.json().await?;
                continue;
            }

            return Ok(check(resp).await?.json().await?);
        }

        Err(Error::Conflict(format!(
            "transaction on {} did not settle after {} attempts",
            path, MAX_TRANSACTION_ATTEMPTS
        )))
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let resp = self
            .request(&self.stream_http, Method::GET, path)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check(resp).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let watched = path.to_string();
        let task = tokio::spawn(async move {
            if let Err(e) = pump_events(resp, tx).await {
                tracing::warn!("Subscription to {} ended: {}", watched, e);
            }
        });

        Ok(Subscription::new(rx, Some(task)))
    }
}

/// Read server-sent events, keep a local copy of the node and forward it
/// after every change
async fn pump_events(mut resp: Response, tx: mpsc::UnboundedSender<Value>) -> Result<()> {
    let mut events = EventBuffer::default();
    let mut node = Value::Null;

    while let Some(chunk) = resp.chunk().await? {
        events.push(&chunk);
        while let Some(block) = events.next_block()? {
            match apply_event(&mut node, &block)? {
                StreamStep::Changed => {
                    if tx.send(node.clone()).is_err() {
                        return Ok(());
                    }
                }
                StreamStep::Ignored => {}
                StreamStep::Closed(reason) => {
                    return Err(Error::Unauthorized(reason));
                }
            }
        }
    }
    Ok(())
}

/// Raw stream bytes, split into blank-line separated event blocks.
/// Chunks may end inside a multi-byte character, so text is only decoded
/// once a whole block has arrived.
#[derive(Default)]
struct EventBuffer {
    bytes: Vec<u8>,
}

impl EventBuffer {
    fn push(&mut self, chunk: &[u8]) {
        // 0x0D never occurs inside a UTF-8 sequence
        self.bytes.extend(chunk.iter().copied().filter(|b| *b != b'\r'));
    }

    fn next_block(&mut self) -> Result<Option<String>> {
        let Some(end) = self.bytes.windows(2).position(|w| w == b"\n\n") else {
            return Ok(None);
        };
        let block: Vec<u8> = self.bytes.drain(..end + 2).collect();
        String::from_utf8(block)
            .map(Some)
            .map_err(|e| Error::Decode(format!("event stream is not UTF-8: {}", e)))
    }
}

#[derive(Debug, PartialEq)]
enum StreamStep {
    Changed,
    Ignored,
    Closed(String),
}

/// Apply one `event:`/`data:` block to the local copy
fn apply_event(node: &mut Value, block: &str) -> Result<StreamStep> {
    let mut event = "";
    let mut data = String::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push_str(rest.trim());
        }
    }

    match event {
        "put" | "patch" => {
            let payload: StreamPayload = serde_json::from_str(&data)?;
            let segs = segments(&payload.path);
            if event == "put" {
                set_at(node, &segs, payload.data);
            } else if let Value::Object(fields) = payload.data {
                for (key, value) in fields {
                    let mut child: Vec<&str> = segs.clone();
                    child.extend(segments(&key));
                    set_at(node, &child, value);
                }
            }
            Ok(StreamStep::Changed)
        }
        "cancel" | "auth_revoked" => Ok(StreamStep::Closed(format!("stream {}", event))),
        _ => Ok(StreamStep::Ignored),
    }
}

fn etag_of(resp: &Response) -> Result<String> {
    resp.headers()
        .get(header::ETAG)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| Error::Decode("response is missing an ETag header".to_string()))
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::Http {
            status: status.as_u16(),
            message,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::as_count;
    use crate::test_support::{Reply, StubServer};
    use serde_json::json;

    fn tree_at(url: &str) -> RestTree {
        let config = DatabaseConfig {
            url: url.to_string(),
            auth: Some("secret".to_string()),
        };
        RestTree::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_node_url_and_missing_url() {
        let config = DatabaseConfig {
            url: "https://blog-rtdb.example.com/".to_string(),
            auth: None,
        };
        let tree = RestTree::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(
            tree.node_url("likes/2024-01-15-hello/count"),
            "https://blog-rtdb.example.com/likes/2024-01-15-hello/count.json"
        );

        assert!(matches!(
            RestTree::new(&DatabaseConfig::default(), Duration::from_secs(5)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_apply_put_and_patch_events() {
        let mut node = Value::Null;

        let step = apply_event(
            &mut node,
            "event: put\ndata: {\"path\":\"/\",\"data\":{\"count\":1,\"users\":{\"u1\":true}}}\n\n",
        )
        .unwrap();
        assert_eq!(step, StreamStep::Changed);
        assert_eq!(node, json!({ "count": 1, "users": { "u1": true } }));

        apply_event(&mut node, "event: put\ndata: {\"path\":\"/count\",\"data\":2}\n\n").unwrap();
        assert_eq!(node["count"], json!(2));

        apply_event(
            &mut node,
            "event: patch\ndata: {\"path\":\"/users\",\"data\":{\"u2\":true,\"u1\":null}}\n\n",
        )
        .unwrap();
        assert_eq!(node, json!({ "count": 2, "users": { "u2": true } }));
    }

    #[test]
    fn test_keep_alive_and_cancel_events() {
        let mut node = json!({ "count": 1 });
        assert_eq!(
            apply_event(&mut node, "event: keep-alive\ndata: null\n\n").unwrap(),
            StreamStep::Ignored
        );
        assert!(matches!(
            apply_event(&mut node, "event: auth_revoked\ndata: null\n\n").unwrap(),
            StreamStep::Closed(_)
        ));
        assert_eq!(node, json!({ "count": 1 }));
    }

    #[test]
    fn test_event_buffer_waits_for_whole_block() {
        let event = "event: put\r\ndata: {\"path\":\"/\",\"data\":\"안녕\"}\r\n\r\n".as_bytes();
        let split = event.iter().position(|b| *b == 0xEC).unwrap() + 1;

        let mut events = EventBuffer::default();
        events.push(&event[..split]);
        assert_eq!(events.next_block().unwrap(), None);

        events.push(&event[split..]);
        let block = events.next_block().unwrap().unwrap();
        assert!(block.contains("\"안녕\""));
        assert_eq!(events.next_block().unwrap(), None);
    }

    #[tokio::test]
    async fn test_subscribe_keeps_characters_split_across_chunks() {
        let event = "event: put\ndata: {\"path\":\"/\",\"data\":{\"text\":\"안녕\"}}\n\n".as_bytes();
        let split = event.iter().position(|b| *b == 0xEC).unwrap() + 1;
        let server = StubServer::start(vec![Reply::event_stream(vec![
            event[..split].to_vec(),
            event[split..].to_vec(),
        ])])
        .await;

        let tree = tree_at(&server.url);
        let mut sub = tree.subscribe("comments/hello").await.unwrap();
        let node = sub.next().await.unwrap();
        assert_eq!(node, json!({ "text": "안녕" }));

        let requests = server.requests();
        assert_eq!(requests[0].header("accept"), Some("text/event-stream"));
        assert!(requests[0].target.starts_with("/comments/hello.json?auth=secret"));
    }

    #[tokio::test]
    async fn test_transaction_retries_with_fresh_etag() {
        let server = StubServer::start(vec![
            Reply::json(200, json!(5)).header("ETag", "e1"),
            Reply::json(412, json!(7)).header("ETag", "e2"),
            Reply::json(200, json!(8)),
        ])
        .await;

        let tree = tree_at(&server.url);
        let committed = tree
            .transaction("views/hello", |current| json!(as_count(current) + 1))
            .await
            .unwrap();
        assert_eq!(committed, json!(8));

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].header("x-firebase-etag"), Some("true"));

        assert_eq!(requests[1].method, "PUT");
        assert_eq!(requests[1].header("if-match"), Some("e1"));
        assert_eq!(requests[1].json(), json!(6));

        // The retry applies the increment to the server's value, not the stale one
        assert_eq!(requests[2].header("if-match"), Some("e2"));
        assert_eq!(requests[2].json(), json!(8));
    }

    #[tokio::test]
    async fn test_transaction_gives_up_after_max_attempts() {
        let mut replies = vec![Reply::json(200, json!(0)).header("ETag", "e0")];
        for i in 1..=MAX_TRANSACTION_ATTEMPTS {
            replies.push(Reply::json(412, json!(i)).header("ETag", &format!("e{}", i)));
        }
        let server = StubServer::start(replies).await;

        let tree = tree_at(&server.url);
        let result = tree
            .transaction("views/hello", |current| json!(as_count(current) + 1))
            .await;
        assert!(result.unwrap_err().is_conflict());
        assert_eq!(server.requests().len(), MAX_TRANSACTION_ATTEMPTS + 1);
    }
}
