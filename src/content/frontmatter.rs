//! Front-matter parsing and serialization
//!
//! Posts start with a small YAML-like header:
//!
//! ```text
//! ---
//! title: "Hello"
//! date: "2024-01-15T10:30:00.000Z"
//! tags: ["rust", "blog"]
//! ---
//! Body text
//! ```
//!
//! This is not YAML. Every `key: value` line splits on its first colon,
//! surrounding quotes are dropped and bracketed values split on commas.
//! Nothing is escaped, so values with embedded commas inside a list are
//! split anyway.

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLOCK: Regex = Regex::new(r"(?s)^---\s*\n(.*?)\n---\s*\n(.*)$").unwrap();
}

/// A single decoded header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    fn into_text(self) -> String {
        match self {
            FieldValue::Text(s) => s,
            FieldValue::List(items) => items.join(", "),
        }
    }
}

/// Front-matter data from a post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
    pub excerpt: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub image: Option<String>,

    /// Keys this codec does not know about, in file order
    pub extra: IndexMap<String, FieldValue>,
}

impl FrontMatter {
    /// Parse front-matter from content string.
    /// Returns (front_matter, body). A missing or malformed header yields
    /// empty metadata and the whole text as body.
    pub fn parse(content: &str) -> (Self, &str) {
        let Some(caps) = BLOCK.captures(content) else {
            return (FrontMatter::default(), content);
        };
        let (Some(header), Some(body)) = (caps.get(1), caps.get(2)) else {
            return (FrontMatter::default(), content);
        };

        let mut fm = FrontMatter::default();
        for line in header.as_str().split('\n') {
            if let Some((key, value)) = parse_line(line) {
                fm.insert(key, value);
            }
        }

        (fm, body.as_str())
    }

    fn insert(&mut self, key: String, value: FieldValue) {
        match key.as_str() {
            "title" => self.title = Some(value.into_text()),
            "date" => self.date = Some(value.into_text()),
            "author" => self.author = Some(value.into_text()),
            "excerpt" => self.excerpt = Some(value.into_text()),
            "category" => self.category = Some(value.into_text()),
            "image" => self.image = Some(value.into_text()),
            // A scalar tags value is not a list and carries no tags
            "tags" => {
                self.tags = match value {
                    FieldValue::List(items) => items,
                    FieldValue::Text(_) => Vec::new(),
                }
            }
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    /// Serialize the header block, without the trailing newline.
    /// Empty `image` values are omitted.
    pub fn render(&self) -> String {
        let mut lines = vec!["---".to_string()];

        let quoted = |key: &str, value: &Option<String>| {
            format!("{}: \"{}\"", key, value.as_deref().unwrap_or_default())
        };
        lines.push(quoted("title", &self.title));
        lines.push(quoted("date", &self.date));
        lines.push(quoted("author", &self.author));
        lines.push(quoted("excerpt", &self.excerpt));
        lines.push(format!(
            "tags: [{}]",
            self.tags
                .iter()
                .map(|t| format!("\"{}\"", t))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        lines.push(quoted("category", &self.category));
        if let Some(image) = self.image.as_deref().filter(|i| !i.is_empty()) {
            lines.push(format!("image: \"{}\"", image));
        }

        for (key, value) in &self.extra {
            match value {
                FieldValue::Text(s) => lines.push(format!("{}: \"{}\"", key, s)),
                FieldValue::List(items) => lines.push(format!(
                    "{}: [{}]",
                    key,
                    items
                        .iter()
                        .map(|t| format!("\"{}\"", t))
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            }
        }

        lines.push("---".to_string());
        lines.join("\n")
    }

    /// Render a complete document: header, newline, body
    pub fn to_document(&self, body: &str) -> String {
        format!("{}\n{}", self.render(), body)
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<Utc>> {
        self.date.as_deref().and_then(parse_date_string)
    }
}

/// Split a header line on its first colon
fn parse_line(line: &str) -> Option<(String, FieldValue)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_string();
    let mut value = value.trim();

    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value = &value[1..value.len() - 1];
    }

    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let items = value[1..value.len() - 1]
            .split(',')
            .map(|item| item.trim().replace(['"', '\''], ""))
            .filter(|item| !item.is_empty())
            .collect();
        return Some((key, FieldValue::List(items)));
    }

    Some((key, FieldValue::Text(value.to_string())))
}

/// Parse a date string in various formats
pub fn parse_date_string(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frontmatter() {
        let content = "---\n\
title: \"Hello World\"\n\
date: \"2024-01-15T10:30:00.000Z\"\n\
author: 'Jane'\n\
excerpt: A short one\n\
tags: [\"rust\", 'blog', web ]\n\
category: \"Dev\"\n\
---\n\
This is the content.\nSecond line.";

        let (fm, body) = FrontMatter::parse(content);
        assert_eq!(fm.title.as_deref(), Some("Hello World"));
        assert_eq!(fm.date.as_deref(), Some("2024-01-15T10:30:00.000Z"));
        assert_eq!(fm.author.as_deref(), Some("Jane"));
        assert_eq!(fm.excerpt.as_deref(), Some("A short one"));
        assert_eq!(fm.tags, vec!["rust", "blog", "web"]);
        assert_eq!(fm.category.as_deref(), Some("Dev"));
        assert_eq!(fm.image, None);
        assert_eq!(body, "This is the content.\nSecond line.");
    }

    #[test]
    fn test_missing_header_returns_whole_text() {
        let content = "Just a body\nwith: a colon";
        let (fm, body) = FrontMatter::parse(content);
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, content);
    }

    #[test]
    fn test_unterminated_header_returns_whole_text() {
        let content = "---\ntitle: \"Never closed\"\nbody";
        let (fm, body) = FrontMatter::parse(content);
        assert_eq!(fm.title, None);
        assert_eq!(body, content);
    }

    #[test]
    fn test_splits_on_first_colon() {
        let content = "---\ntitle: \"Time: 10:30\"\nimage: https://example.com/a.png\n---\nbody";
        let (fm, _) = FrontMatter::parse(content);
        assert_eq!(fm.title.as_deref(), Some("Time: 10:30"));
        assert_eq!(fm.image.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn test_quoted_comma_is_still_split() {
        let content = "---\ntags: [\"a, b\", \"c\"]\n---\nbody";
        let (fm, _) = FrontMatter::parse(content);
        assert_eq!(fm.tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_scalar_tags_and_unknown_keys() {
        let content = "---\ntags: notes\nlayout: wide\nseries: [one, two]\n---\nbody";
        let (fm, _) = FrontMatter::parse(content);
        assert!(fm.tags.is_empty());
        assert_eq!(
            fm.extra.get("layout"),
            Some(&FieldValue::Text("wide".to_string()))
        );
        assert_eq!(
            fm.extra.get("series"),
            Some(&FieldValue::List(vec!["one".to_string(), "two".to_string()]))
        );
    }

    #[test]
    fn test_round_trip() {
        let fm = FrontMatter {
            title: Some("안녕하세요 Rust".to_string()),
            date: Some("2024-01-15T10:30:00.000Z".to_string()),
            author: Some("Jane Doe".to_string()),
            excerpt: Some("Short summary of the post".to_string()),
            tags: vec!["rust".to_string(), "한글".to_string()],
            category: Some("Programming".to_string()),
            image: Some("/assets/img/cover.png".to_string()),
            extra: IndexMap::new(),
        };
        let body = "# Heading\n\nSome *markdown* here.\n";

        let document = fm.to_document(body);
        let (decoded, decoded_body) = FrontMatter::parse(&document);
        assert_eq!(decoded, fm);
        assert_eq!(decoded_body, body);
    }

    #[test]
    fn test_render_omits_empty_image_and_keeps_empty_tags() {
        let fm = FrontMatter {
            title: Some("T".to_string()),
            image: Some(String::new()),
            ..Default::default()
        };
        let header = fm.render();
        assert!(!header.contains("image:"));
        assert!(header.contains("tags: []"));

        let (decoded, _) = FrontMatter::parse(&fm.to_document("body"));
        assert!(decoded.tags.is_empty());
        assert_eq!(decoded.image, None);
    }

    #[test]
    fn test_parse_date() {
        let fm = FrontMatter {
            date: Some("2024-01-15T10:30:00.000Z".to_string()),
            ..Default::default()
        };
        let dt = fm.parse_date().unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-15 10:30");

        assert!(parse_date_string("2024-01-15").is_some());
        assert!(parse_date_string("2024-01-15 10:30:00").is_some());
        assert!(parse_date_string("not a date").is_none());
    }
}
