//! List posts and their taxonomy

use anyhow::Result;

use super::engage::view_counts;
use crate::helpers::{display_date, format_view_count};
use crate::listing::{paginate, taxonomy, PostFilter};
use crate::GitPost;

/// List one page of posts matching `filter`
pub async fn run(app: &GitPost, filter: &PostFilter, page: usize) -> Result<()> {
    let posts = app.load_posts().await?;
    let matching = filter.apply(&posts);

    if matching.is_empty() {
        println!("No posts found");
        return Ok(());
    }

    let page = paginate(&matching, page, app.config.per_page);
    let ids: Vec<String> = page.items.iter().map(|p| p.id.clone()).collect();
    let views = view_counts(app, &ids).await;

    for post in &page.items {
        let count = views.get(&post.id).copied().unwrap_or(0);
        println!("{}", post.title);
        println!(
            "  {} | {} | {} | {} views",
            display_date(&post.date),
            post.author,
            post.category,
            format_view_count(count)
        );
        println!("  {}", post.excerpt);
        if !post.tags.is_empty() {
            println!("  #{}", post.tags.join(" #"));
        }
        println!("  id: {}", post.id);
        println!();
    }

    println!(
        "Page {} of {} ({} posts)",
        page.current, page.total_pages, page.total
    );
    if let Some(next) = page.next() {
        println!("Next: --page {}", next);
    }
    Ok(())
}

/// List categories and tags with post counts
pub async fn show_taxonomy(app: &GitPost) -> Result<()> {
    let posts = app.load_posts().await?;
    let tax = taxonomy(&posts);

    println!("Categories ({}):", tax.categories.len());
    for (category, count) in &tax.categories {
        println!("  {} ({})", category, count);
    }

    println!("Tags ({}):", tax.tags.len());
    for (tag, count) in &tax.tags {
        println!("  {} ({})", tag, count);
    }
    Ok(())
}
