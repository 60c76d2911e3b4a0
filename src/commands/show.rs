//! Show a single post

use anyhow::Result;

use super::engage::record_view;
use crate::content::MarkdownRenderer;
use crate::engagement::{Comments, Likes};
use crate::helpers::{display_date, format_view_count};
use crate::listing::{find_post, neighbors, recent, taxonomy};
use crate::GitPost;

pub async fn run(app: &GitPost, post_id: &str, html: bool) -> Result<()> {
    let posts = app.load_posts().await?;
    let Some(post) = find_post(&posts, post_id) else {
        anyhow::bail!("Post not found: {}", post_id);
    };

    let mut state = app.load_state();
    let views = record_view(app, &mut state, post_id).await;
    let device = state.device_id(chrono::Utc::now());
    app.save_state(&state)?;

    println!("{}", post.title);
    println!(
        "{} | {} | {}",
        display_date(&post.date),
        post.author,
        post.category
    );
    if let Some(outcome) = views {
        println!("{} views", format_view_count(outcome.count));
    }
    if !post.tags.is_empty() {
        println!("#{}", post.tags.join(" #"));
    }
    if let Some(image) = &post.image {
        println!("Cover: {}", image);
    }
    println!();

    if html {
        println!("{}", MarkdownRenderer::new().render(&post.content));
    } else {
        println!("{}", post.content);
    }
    println!();

    if let Some(tree) = app.tree()? {
        let likes = Likes::new(tree.clone(), device.clone());
        match likes.status(post_id).await {
            Ok(status) => println!("{} likes{}", status.count, if status.liked { " (you)" } else { "" }),
            Err(e) => tracing::warn!("Error getting like status: {}", e),
        }
        match Comments::new(tree, device, &app.config).count(post_id).await {
            Ok(count) => println!("{} comments", count),
            Err(e) => tracing::warn!("Error getting comment count: {}", e),
        }
        println!();
    }

    let (newer, older) = neighbors(&posts, post_id);
    if let Some(p) = newer {
        println!("Previous: {} ({})", p.title, p.id);
    }
    if let Some(p) = older {
        println!("Next: {} ({})", p.title, p.id);
    }

    println!();
    println!("Recent posts:");
    for p in recent(&posts, app.config.recent_posts) {
        println!("  {} - {}", display_date(&p.date), p.title);
    }

    let tax = taxonomy(&posts);
    let tags: Vec<&str> = tax.tags.keys().map(String::as_str).collect();
    if !tags.is_empty() {
        println!("Tags: {}", tags.join(", "));
    }
    Ok(())
}
