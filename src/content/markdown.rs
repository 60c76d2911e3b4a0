//! Markdown rendering

use pulldown_cmark::{html, CowStr, Event, Options, Parser};

/// Markdown renderer for post bodies
pub struct MarkdownRenderer {
    hard_breaks: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer. Single newlines become `<br>`.
    pub fn new() -> Self {
        Self { hard_breaks: true }
    }

    /// Create with custom settings
    pub fn with_options(hard_breaks: bool) -> Self {
        Self { hard_breaks }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_GFM;
        let parser = Parser::new_ext(markdown, options);

        let events = parser.filter_map(|event| match event {
            Event::SoftBreak if self.hard_breaks => Some(Event::HardBreak),
            // <meta> tags inside a post would override the page's own headers
            Event::Html(raw) | Event::InlineHtml(raw) if is_meta_tag(&raw) => None,
            Event::Html(raw) => Some(Event::Html(strip_meta_lines(raw))),
            other => Some(other),
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, events);
        html_output
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_meta_tag(raw: &str) -> bool {
    raw.trim_start().to_ascii_lowercase().starts_with("<meta")
}

fn strip_meta_lines(raw: CowStr<'_>) -> CowStr<'_> {
    if !raw.to_ascii_lowercase().contains("<meta") {
        return raw;
    }
    let kept: Vec<&str> = raw.lines().filter(|line| !is_meta_tag(line)).collect();
    CowStr::from(kept.join("\n"))
}
