//! Editor form contents

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;

use crate::config::BlogConfig;
use crate::content::{post_filename, FieldValue, FrontMatter};
use crate::error::{Error, Result};

/// A post being written or edited
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub excerpt: String,
    pub body: String,
    /// Empty means the configured default category
    pub category: String,
    pub author: String,
    /// Cover image URL, omitted from the header when empty
    pub image: String,
    pub tags: Vec<String>,
    /// Header keys carried over from an edited post
    pub extra: IndexMap<String, FieldValue>,
}

impl Draft {
    /// Fill a draft from an existing post file
    pub fn from_source(source: &str, config: &BlogConfig) -> Self {
        let (fm, body) = FrontMatter::parse(source);
        Self {
            title: fm.title.unwrap_or_default(),
            excerpt: fm.excerpt.unwrap_or_default(),
            body: body.to_string(),
            category: fm.category.unwrap_or_default(),
            author: fm
                .author
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| config.default_author.clone()),
            image: fm.image.unwrap_or_default(),
            tags: fm.tags,
            extra: fm.extra,
        }
    }

    /// Add a tag. Blank and duplicate tags are ignored.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Title, excerpt and body are required
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() || self.excerpt.trim().is_empty() || self.body.trim().is_empty() {
            return Err(Error::Validation(
                "Title, excerpt and body are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Filename the draft is published under at `now`
    pub fn filename(&self, now: DateTime<Utc>, config: &BlogConfig) -> String {
        post_filename(&now, self.title.trim(), config.slug_max_len)
    }

    /// The header written for this draft at `now`
    pub fn front_matter(&self, now: DateTime<Utc>, config: &BlogConfig) -> FrontMatter {
        let category = match self.category.trim() {
            "" => config.default_category.clone(),
            c => c.to_string(),
        };
        FrontMatter {
            title: Some(self.title.trim().to_string()),
            date: Some(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            author: Some(self.author.trim().to_string()),
            excerpt: Some(self.excerpt.trim().to_string()),
            tags: self.tags.clone(),
            category: Some(category),
            image: Some(self.image.trim().to_string()).filter(|i| !i.is_empty()),
            extra: self.extra.clone(),
        }
    }

    /// Full file contents: header, newline, trimmed body
    pub fn to_document(&self, now: DateTime<Utc>, config: &BlogConfig) -> String {
        self.front_matter(now, config).to_document(self.body.trim())
    }
}
