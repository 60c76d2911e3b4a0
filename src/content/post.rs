//! Post model

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::filename::post_id;
use super::FrontMatter;
use crate::config::BlogConfig;

/// A blog post decoded from its Markdown file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Filename without extension, used in URLs and database keys
    pub id: String,

    /// File name inside the posts directory
    pub filename: String,

    pub title: String,

    /// Publication date as written in the header (ISO 8601)
    pub date: String,

    pub author: String,

    pub excerpt: String,

    /// Cover image URL
    pub image: Option<String>,

    pub tags: Vec<String>,

    pub category: String,

    /// Raw markdown body
    pub content: String,
}

impl Post {
    /// Decode a post file, filling absent header fields with defaults
    pub fn from_source(filename: &str, source: &str, config: &BlogConfig, now: DateTime<Utc>) -> Self {
        let (fm, body) = FrontMatter::parse(source);
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let excerpt = non_empty(fm.excerpt).unwrap_or_else(|| {
            let preview: String = body.chars().take(config.excerpt_length).collect();
            format!("{}...", preview)
        });

        Self {
            id: post_id(filename),
            filename: filename.to_string(),
            title: non_empty(fm.title).unwrap_or_else(|| "Untitled".to_string()),
            date: non_empty(fm.date)
                .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true)),
            author: non_empty(fm.author).unwrap_or_else(|| config.default_author.clone()),
            excerpt,
            image: non_empty(fm.image),
            tags: fm.tags,
            category: non_empty(fm.category).unwrap_or_else(|| config.fallback_category.clone()),
            content: body.to_string(),
        }
    }

    /// Parsed publication date
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        super::frontmatter::parse_date_string(&self.date)
    }

    /// Get the previous (newer) post in a newest-first list
    pub fn prev<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.id == self.id)?;
        if pos > 0 {
            Some(&posts[pos - 1])
        } else {
            None
        }
    }

    /// Get the next (older) post in a newest-first list
    pub fn next<'a>(&self, posts: &'a [Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.id == self.id)?;
        posts.get(pos + 1)
    }
}

/// Sort posts newest first. Posts whose date cannot be parsed go last,
/// keeping their index order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| match (a.published_at(), b.published_at()) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}
