//! Device-local state
//!
//! Keeps what a browser would keep in local storage: the session token,
//! the cached account, an anonymous device ID and the last time each post
//! was viewed from this device. Nothing here is authenticated; anyone with
//! access to the file can change it.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::github::GitHubUser;

/// State directory, relative to the site directory
const STATE_DIR: &str = ".gitpost";
/// State file name
const STATE_FILE: &str = "state.json";

/// Persistent device state
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocalState {
    /// Version of the state format
    pub version: u32,
    /// GitHub personal access token
    pub token: Option<String>,
    /// Account the token belongs to, cached at login
    pub user: Option<GitHubUser>,
    /// Anonymous identity used for likes and comment ownership
    pub device_id: Option<String>,
    /// Last counted view per post ID (milliseconds since epoch)
    #[serde(default)]
    pub visits: HashMap<String, i64>,
    /// View counts kept on this device when no database is configured
    #[serde(default)]
    pub local_views: HashMap<String, u64>,
}

impl LocalState {
    /// Current state format version
    const VERSION: u32 = 1;

    /// Create an empty state with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load state from disk, or start fresh
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(STATE_DIR).join(STATE_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<LocalState>(&content) {
                Ok(state) if state.version == Self::VERSION => return state,
                Ok(_) => tracing::info!("State version mismatch, starting fresh"),
                Err(e) => tracing::warn!("Ignoring unreadable state {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    /// Save state to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let dir = base_dir.join(STATE_DIR);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(STATE_FILE), serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// The device ID, generated on first use: `user_{millis}_{9 base-36 chars}`
    pub fn device_id(&mut self, now: DateTime<Utc>) -> String {
        if let Some(id) = &self.device_id {
            return id.clone();
        }

        const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        let suffix: String = (0..9)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        let id = format!("user_{}_{}", now.timestamp_millis(), suffix);

        self.device_id = Some(id.clone());
        id
    }

    /// Store a verified session
    pub fn set_session(&mut self, token: &str, user: GitHubUser) {
        self.token = Some(token.to_string());
        self.user = Some(user);
    }

    /// Forget the session
    pub fn clear_session(&mut self) {
        self.token = None;
        self.user = None;
    }

    /// Whether this device counted a view of `post_id` less than `window` ago
    pub fn is_duplicate_visit(&self, post_id: &str, now: DateTime<Utc>, window: Duration) -> bool {
        match self.visits.get(post_id) {
            Some(&last) => now.timestamp_millis() - last < window.num_milliseconds(),
            None => false,
        }
    }

    /// Remember that a view of `post_id` was counted at `now`
    pub fn record_visit(&mut self, post_id: &str, now: DateTime<Utc>) {
        self.visits.insert(post_id.to_string(), now.timestamp_millis());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut state = LocalState::new();
        let id = state.device_id(now);
        state.record_visit("p1", now);
        state.set_session(
            "tok",
            GitHubUser {
                login: "someone".to_string(),
                name: None,
                email: None,
                avatar_url: None,
            },
        );
        state.save(dir.path()).unwrap();

        let mut loaded = LocalState::load(dir.path());
        assert_eq!(loaded.device_id(now), id);
        assert_eq!(loaded.token.as_deref(), Some("tok"));
        assert_eq!(loaded.visits.get("p1"), Some(&now.timestamp_millis()));
    }

    #[test]
    fn test_load_missing_or_garbage() {
        let dir = TempDir::new().unwrap();
        assert_eq!(LocalState::load(dir.path()).version, LocalState::VERSION);

        fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        fs::write(dir.path().join(STATE_DIR).join(STATE_FILE), "not json").unwrap();
        let state = LocalState::load(dir.path());
        assert!(state.token.is_none());
    }

    #[test]
    fn test_device_id_format_and_stability() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut state = LocalState::new();
        let id = state.device_id(now);
        assert!(id.starts_with(&format!("user_{}_", now.timestamp_millis())));
        assert_eq!(id.rsplit('_').next().map(str::len), Some(9));
        assert_eq!(state.device_id(now + Duration::days(1)), id);
    }

    #[test]
    fn test_duplicate_visit_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let window = Duration::hours(24);
        let mut state = LocalState::new();

        assert!(!state.is_duplicate_visit("p1", start, window));
        state.record_visit("p1", start);
        assert!(state.is_duplicate_visit("p1", start + Duration::hours(23), window));
        assert!(!state.is_duplicate_visit("p1", start + Duration::hours(24), window));
        assert!(!state.is_duplicate_visit("p2", start, window));
    }
}
