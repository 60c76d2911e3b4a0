//! Blog configuration (_config.yml)

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Longest accepted view dedup window (ten years)
const MAX_VIEW_DEDUP_HOURS: i64 = 24 * 365 * 10;

/// Main blog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlogConfig {
    // Site
    pub title: String,
    pub default_author: String,
    pub default_category: String,
    pub fallback_category: String,

    /// Base URL of the published static site. Empty means the site
    /// directory itself is read as a local checkout.
    pub site_url: String,

    // Repository layout
    pub posts_dir: String,
    pub index_path: String,

    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub database: DatabaseConfig,

    // Listing
    pub per_page: usize,
    pub recent_posts: usize,
    pub excerpt_length: usize,

    // Writing
    pub slug_max_len: usize,
    pub comment_max_len: usize,

    // Engagement
    pub view_dedup_hours: i64,

    // Remote calls
    pub index_retry_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            default_author: "Anonymous".to_string(),
            default_category: "General".to_string(),
            fallback_category: "Uncategorized".to_string(),

            site_url: String::new(),

            posts_dir: "_posts".to_string(),
            index_path: "data/posts-index.json".to_string(),

            github: GitHubConfig::default(),
            database: DatabaseConfig::default(),

            per_page: 6,
            recent_posts: 5,
            excerpt_length: 150,

            slug_max_len: 50,
            comment_max_len: 500,

            view_dedup_hours: 24,

            index_retry_limit: 5,
            request_timeout_secs: 30,
        }
    }
}

impl BlogConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: BlogConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the crate cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_VIEW_DEDUP_HOURS).contains(&self.view_dedup_hours) {
            return Err(Error::Config(format!(
                "view_dedup_hours must be between 0 and {}, got {}",
                MAX_VIEW_DEDUP_HOURS, self.view_dedup_hours
            )));
        }
        Ok(())
    }

    /// How long a device's visit keeps it from counting the same post again.
    /// Out-of-range hours are clamped.
    pub fn view_dedup_window(&self) -> Duration {
        let hours = self.view_dedup_hours.clamp(0, MAX_VIEW_DEDUP_HOURS);
        Duration::try_hours(hours).unwrap_or_else(Duration::zero)
    }

    /// Repository path of a post file
    pub fn post_path(&self, filename: &str) -> String {
        format!("{}/{}", self.posts_dir.trim_end_matches('/'), filename)
    }

    /// Whether a realtime database is configured
    pub fn has_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }
}

/// GitHub repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_url: String,
    #[serde(default)]
    pub authorized_users: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            api_url: "https://api.github.com".to_string(),
            authorized_users: Vec::new(),
        }
    }
}

/// Realtime database settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database root, e.g. `https://my-blog-default-rtdb.firebaseio.com`
    pub url: String,
    /// Optional credential appended as the `auth` query parameter
    pub auth: Option<String>,
}
