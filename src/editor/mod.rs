//! Editor workflow - publish, update and delete posts in the repository
//!
//! Every change commits the post file and then the index. The two
//! commits are independent: a rename deletes the old file before creating
//! the new one, and a failure in between leaves the post missing.

pub mod auth;
mod draft;

pub use draft::Draft;

use chrono::{DateTime, Utc};

use crate::config::BlogConfig;
use crate::error::{Error, Result};
use crate::github::{write_file, ContentApi};
use crate::index::{IndexOp, IndexSync};

/// What the editor is working on
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Editing the post stored under `filename`
    Editing { filename: String },
}

/// How a publish changed the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Created,
    Updated,
    /// The title changed, so the post moved to a new filename
    Renamed { from: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub filename: String,
    pub published: Published,
}

/// Result of a delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// File and index entry removed
    Deleted,
    /// The file was already gone; only the index entry was removed
    IndexOnly,
}

pub struct Editor<'a, C: ContentApi> {
    api: &'a C,
    config: &'a BlogConfig,
    mode: Mode,
}

impl<'a, C: ContentApi> Editor<'a, C> {
    pub fn new(api: &'a C, config: &'a BlogConfig) -> Self {
        Self {
            api,
            config,
            mode: Mode::Idle,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    fn index(&self) -> IndexSync<'a, C> {
        IndexSync::new(self.api, &self.config.index_path, self.config.index_retry_limit)
    }

    /// Switch to editing `filename` and return its contents as a draft
    pub fn begin_edit(&mut self, filename: &str, source: &str) -> Draft {
        self.mode = Mode::Editing {
            filename: filename.to_string(),
        };
        Draft::from_source(source, self.config)
    }

    /// Fetch a post from the repository and start editing it
    pub async fn open(&mut self, filename: &str) -> Result<Draft> {
        let file = self
            .api
            .get_file(&self.config.post_path(filename))
            .await?
            .ok_or_else(|| Error::NotFound(filename.to_string()))?;
        Ok(self.begin_edit(filename, &file.text))
    }

    /// Drop the editing state
    pub fn cancel(&mut self) {
        self.mode = Mode::Idle;
    }

    /// Publish a draft. When idle this creates a new post; when editing it
    /// updates the post in place or moves it if the filename changed.
    pub async fn publish(&mut self, draft: &Draft, now: DateTime<Utc>) -> Result<PublishOutcome> {
        draft.validate()?;

        let filename = draft.filename(now, self.config);
        let path = self.config.post_path(&filename);
        let document = draft.to_document(now, self.config);

        let editing = match &self.mode {
            Mode::Editing { filename } => Some(filename.clone()),
            Mode::Idle => None,
        };

        let published = match editing {
            None => {
                write_file(self.api, &path, &document, &format!("Add new post: {}", filename)).await?;
                self.index().update(&IndexOp::Add(filename.clone())).await?;
                Published::Created
            }
            Some(old) if old == filename => {
                write_file(self.api, &path, &document, &format!("Update post: {}", filename)).await?;
                Published::Updated
            }
            Some(old) => {
                self.api
                    .delete_file(&self.config.post_path(&old), &format!("Delete old post: {}", old))
                    .await?;
                write_file(self.api, &path, &document, &format!("Update post: {}", filename)).await?;
                self.index()
                    .update(&IndexOp::Replace {
                        old: old.clone(),
                        new: filename.clone(),
                    })
                    .await?;
                Published::Renamed { from: old }
            }
        };

        tracing::info!("Published {} ({:?})", filename, published);
        self.mode = Mode::Idle;
        Ok(PublishOutcome { filename, published })
    }

    /// Delete a post and its index entry. A post file that is already gone
    /// still has its index entry removed.
    pub async fn delete(&mut self, filename: &str) -> Result<DeleteOutcome> {
        let path = self.config.post_path(filename);
        let outcome = match self
            .api
            .delete_file(&path, &format!("Delete post: {}", filename))
            .await
        {
            Ok(()) => DeleteOutcome::Deleted,
            Err(e) if e.is_not_found() => {
                tracing::warn!("File {} not found on GitHub, removing from index only", filename);
                DeleteOutcome::IndexOnly
            }
            Err(e) => return Err(e),
        };

        self.index().update(&IndexOp::Remove(filename.to_string())).await?;

        if matches!(&self.mode, Mode::Editing { filename: f } if f == filename) {
            self.mode = Mode::Idle;
        }
        Ok(outcome)
    }
}
