//! Content module - post files, their header codec and rendering

mod filename;
mod frontmatter;
pub mod loader;
mod markdown;
mod post;

pub use filename::{post_filename, post_id, slugify};
pub use frontmatter::{parse_date_string, FieldValue, FrontMatter};
pub use loader::{load_posts, LocalSite, PostSource, StaticSite};
pub use markdown::MarkdownRenderer;
pub use post::{sort_newest_first, Post};
