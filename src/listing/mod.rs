//! Listing - filtering, pagination and taxonomy over loaded posts

mod pagination;

pub use pagination::{paginate, Page};

use indexmap::IndexMap;
use serde::Serialize;

use crate::content::Post;

/// List filter; empty criteria match every post and criteria combine
/// with AND
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Case-insensitive substring of the title or excerpt
    pub search: Option<String>,
    /// Exact category
    pub category: Option<String>,
    /// Exact tag the post must carry
    pub tag: Option<String>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        let search = self
            .search
            .as_deref()
            .map(str::to_lowercase)
            .filter(|s| !s.is_empty());
        let matches_search = search.map_or(true, |term| {
            post.title.to_lowercase().contains(&term) || post.excerpt.to_lowercase().contains(&term)
        });

        let matches_category = non_empty(&self.category).map_or(true, |c| post.category == c);
        let matches_tag = non_empty(&self.tag).map_or(true, |t| post.tags.iter().any(|pt| pt == t));

        matches_search && matches_category && matches_tag
    }

    /// Posts matching the filter, keeping their order
    pub fn apply<'a>(&self, posts: &'a [Post]) -> Vec<&'a Post> {
        posts.iter().filter(|p| self.matches(p)).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Distinct categories and tags with the number of posts using each,
/// in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Taxonomy {
    pub categories: IndexMap<String, usize>,
    pub tags: IndexMap<String, usize>,
}

pub fn taxonomy(posts: &[Post]) -> Taxonomy {
    let mut result = Taxonomy::default();
    for post in posts {
        if !post.category.is_empty() {
            *result.categories.entry(post.category.clone()).or_insert(0) += 1;
        }
        for tag in &post.tags {
            *result.tags.entry(tag.clone()).or_insert(0) += 1;
        }
    }
    result
}

/// Find a post by its ID
pub fn find_post<'a>(posts: &'a [Post], id: &str) -> Option<&'a Post> {
    posts.iter().find(|p| p.id == id)
}

/// Newer and older neighbours of a post in a newest-first list
pub fn neighbors<'a>(posts: &'a [Post], id: &str) -> (Option<&'a Post>, Option<&'a Post>) {
    match find_post(posts, id) {
        Some(post) => (post.prev(posts), post.next(posts)),
        None => (None, None),
    }
}

/// The `n` most recent posts
pub fn recent(posts: &[Post], n: usize) -> &[Post] {
    &posts[..n.min(posts.len())]
}
