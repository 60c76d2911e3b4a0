//! Publish and edit posts

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::PathBuf;

use crate::editor::{Draft, Editor, Published};
use crate::GitPost;

/// Post fields given on the command line. Unset fields leave the draft
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct PostFields {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    /// File holding the Markdown body
    pub body_file: Option<PathBuf>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
    /// Tags to add
    pub tags: Vec<String>,
    /// Tags to remove
    pub remove_tags: Vec<String>,
}

impl PostFields {
    fn apply_to(&self, draft: &mut Draft) -> Result<()> {
        if let Some(title) = &self.title {
            draft.title = title.clone();
        }
        if let Some(excerpt) = &self.excerpt {
            draft.excerpt = excerpt.clone();
        }
        if let Some(path) = &self.body_file {
            draft.body = fs::read_to_string(path)
                .with_context(|| format!("Failed to read body from {:?}", path))?;
        }
        if let Some(category) = &self.category {
            draft.category = category.clone();
        }
        if let Some(author) = &self.author {
            draft.author = author.clone();
        }
        if let Some(image) = &self.image {
            draft.image = image.clone();
        }
        for tag in &self.remove_tags {
            draft.remove_tag(tag);
        }
        for tag in &self.tags {
            draft.add_tag(tag);
        }
        Ok(())
    }
}

/// Publish a new post
pub async fn publish(app: &GitPost, fields: &PostFields) -> Result<()> {
    let mut draft = Draft {
        author: app.config.default_author.clone(),
        ..Default::default()
    };
    fields.apply_to(&mut draft)?;
    // Validate before touching the network
    draft.validate()?;

    let mut state = app.load_state();
    let client = app.editor_client(&mut state).await?;
    let mut editor = Editor::new(&client, &app.config);

    let outcome = editor.publish(&draft, Utc::now()).await?;
    println!("Published {}", outcome.filename);
    Ok(())
}

/// Update an existing post
pub async fn edit(app: &GitPost, filename: &str, fields: &PostFields) -> Result<()> {
    let mut state = app.load_state();
    let client = app.editor_client(&mut state).await?;
    let mut editor = Editor::new(&client, &app.config);

    let mut draft = editor.open(filename).await?;
    fields.apply_to(&mut draft)?;

    let outcome = editor.publish(&draft, Utc::now()).await?;
    match outcome.published {
        Published::Renamed { from } => println!("Updated {} (moved from {})", outcome.filename, from),
        _ => println!("Updated {}", outcome.filename),
    }
    Ok(())
}
