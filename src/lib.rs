//! gitpost: a static blog kept in a GitHub repository
//!
//! Posts are Markdown files with a small header, committed through the
//! GitHub contents API and listed by a JSON index. View counts, likes and
//! comments live in a realtime database reached over REST.

pub mod commands;
pub mod config;
pub mod content;
pub mod editor;
pub mod engagement;
pub mod error;
pub mod github;
pub mod helpers;
pub mod index;
pub mod listing;
pub mod realtime;
pub mod state;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use content::{LocalSite, Post, StaticSite};
use github::GitHubClient;
use realtime::RestTree;
use state::LocalState;

/// Environment variable that overrides the stored session token
pub const TOKEN_ENV: &str = "GITPOST_TOKEN";

/// The main application
#[derive(Clone)]
pub struct GitPost {
    /// Blog configuration
    pub config: config::BlogConfig,
    /// Site directory
    pub base_dir: PathBuf,
}

impl GitPost {
    /// Create a new instance from a site directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::BlogConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::BlogConfig::default()
        };

        Ok(Self { config, base_dir })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }

    pub fn load_state(&self) -> LocalState {
        LocalState::load(&self.base_dir)
    }

    pub fn save_state(&self, state: &LocalState) -> Result<()> {
        state.save(&self.base_dir)
    }

    /// GitHub client for `token`
    pub fn github(&self, token: &str) -> Result<GitHubClient> {
        GitHubClient::new(&self.config.github, token, self.timeout())
    }

    /// A client for an authorized editor: the token from the environment,
    /// or the stored session
    pub async fn editor_client(&self, state: &mut LocalState) -> anyhow::Result<GitHubClient> {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            let client = self.github(&token)?;
            let user = client.current_user().await?;
            editor::auth::authorize(&user, &self.config.github)?;
            tracing::debug!("Using {} token for {}", TOKEN_ENV, user.login);
            return Ok(client);
        }

        match editor::auth::restore_session(state, &self.config.github) {
            Ok(Some((token, user))) => {
                tracing::debug!("Using stored session for {}", user.login);
                Ok(self.github(&token)?)
            }
            Ok(None) => anyhow::bail!("Not signed in. Run `gitpost login` first."),
            Err(e) => {
                self.save_state(state)?;
                Err(e.into())
            }
        }
    }

    /// The realtime database, if one is configured
    pub fn tree(&self) -> Result<Option<Arc<RestTree>>> {
        if !self.config.has_database() {
            return Ok(None);
        }
        Ok(Some(Arc::new(RestTree::new(&self.config.database, self.timeout())?)))
    }

    /// Load all published posts, newest first. Without a `site_url` the
    /// site directory is read as a checkout of the repository.
    pub async fn load_posts(&self) -> Result<Vec<Post>> {
        if self.config.site_url.trim().is_empty() {
            let site = Arc::new(LocalSite::new(&self.base_dir, &self.config));
            content::load_posts(site, &self.config, Utc::now()).await
        } else {
            let site = Arc::new(StaticSite::new(&self.config)?);
            content::load_posts(site, &self.config, Utc::now()).await
        }
    }
}
