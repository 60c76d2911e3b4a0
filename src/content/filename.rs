//! Post filename and ID derivation

use chrono::{DateTime, TimeZone};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref DISALLOWED: Regex = Regex::new(r"[^a-z0-9\x{AC00}-\x{D7A3}\s-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Build a URL-friendly slug from a post title.
///
/// Lowercases, drops everything except ASCII alphanumerics, Hangul
/// syllables, whitespace and hyphens, turns whitespace runs into single
/// hyphens and keeps at most `max_len` characters.
pub fn slugify(title: &str, max_len: usize) -> String {
    let lowered = title.to_lowercase();
    let kept = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(&kept, "-");
    hyphenated.chars().take(max_len).collect()
}

/// Filename for a post published at `date`: `YYYY-MM-DD-slug.md`
pub fn post_filename<Tz: TimeZone>(date: &DateTime<Tz>, title: &str, max_len: usize) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}-{}.md",
        date.format("%Y-%m-%d"),
        slugify(title, max_len)
    )
}

/// Post ID used in URLs and database keys: the filename without `.md`
pub fn post_id(filename: &str) -> String {
    filename.replacen(".md", "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Hello World", 50), "hello-world");
        assert_eq!(slugify("  Rust   is  fun ", 50), "-rust-is-fun-");
        assert_eq!(slugify("Already-hyphen ated", 50), "already-hyphen-ated");
    }

    #[test]
    fn test_slugify_strips_symbols_keeps_hangul() {
        assert_eq!(slugify("안녕하세요, Rust!", 50), "안녕하세요-rust");
        assert_eq!(slugify("C++ & Go: 2024 édition", 50), "c-go-2024-dition");
        assert_eq!(slugify("日本語 title", 50), "-title");
    }

    #[test]
    fn test_slugify_truncates_on_chars() {
        let title = "가".repeat(60);
        let slug = slugify(&title, 50);
        assert_eq!(slug.chars().count(), 50);
    }

    #[test]
    fn test_slugify_deterministic_and_idempotent() {
        let title = "My First Post: 시작!";
        let once = slugify(title, 50);
        assert_eq!(once, slugify(title, 50));
        assert_eq!(slugify(&once, 50), once);
    }

    #[test]
    fn test_post_filename_and_id() {
        let date = Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 0).unwrap();
        let filename = post_filename(&date, "Hello World", 50);
        assert_eq!(filename, "2024-01-15-hello-world.md");
        assert_eq!(post_id(&filename), "2024-01-15-hello-world");
    }
}
