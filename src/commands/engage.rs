//! Views, likes and comments

use anyhow::{Context, Result};
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::Arc;

use crate::engagement::{Comment, Comments, LikeState, Likes, LocalViewCounter, ViewCounter, ViewOutcome};
use crate::helpers::{format_view_count, relative_date};
use crate::realtime::RestTree;
use crate::state::LocalState;
use crate::GitPost;

fn require_tree(app: &GitPost) -> Result<Arc<RestTree>> {
    app.tree()?
        .context("No database configured; set database.url in _config.yml")
}

/// Device ID, created and saved on first use
fn device_id(app: &GitPost) -> Result<String> {
    let mut state = app.load_state();
    let id = state.device_id(Utc::now());
    app.save_state(&state)?;
    Ok(id)
}

/// Count a visit of this device. Falls back to local counting without a
/// database; failures are logged and yield `None`.
pub(crate) async fn record_view(app: &GitPost, state: &mut LocalState, post_id: &str) -> Option<ViewOutcome> {
    let now = Utc::now();
    match app.tree() {
        Ok(Some(tree)) => match ViewCounter::new(tree, &app.config)
            .record_view(state, post_id, now)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!("Error incrementing view count: {}", e);
                None
            }
        },
        Ok(None) => Some(LocalViewCounter::new(&app.config).record_view(state, post_id, now)),
        Err(e) => {
            tracing::warn!("Database unavailable: {}", e);
            None
        }
    }
}

/// View counts of `ids`; unreadable counts show as zero
pub(crate) async fn view_counts(app: &GitPost, ids: &[String]) -> IndexMap<String, u64> {
    match app.tree() {
        Ok(Some(tree)) => ViewCounter::new(tree, &app.config).counts(ids).await,
        Ok(None) => {
            let state = app.load_state();
            let counter = LocalViewCounter::new(&app.config);
            ids.iter().map(|id| (id.clone(), counter.count(&state, id))).collect()
        }
        Err(e) => {
            tracing::warn!("Database unavailable: {}", e);
            ids.iter().map(|id| (id.clone(), 0)).collect()
        }
    }
}

/// Print view counts of the given posts, or of every post
pub async fn views(app: &GitPost, ids: &[String]) -> Result<()> {
    let counts = if !ids.is_empty() {
        view_counts(app, ids).await
    } else if let Some(tree) = app.tree()? {
        ViewCounter::new(tree, &app.config).all_counts().await?
    } else {
        app.load_state().local_views.into_iter().collect()
    };

    for (id, count) in &counts {
        println!("{:>8}  {}", format_view_count(*count), id);
    }
    Ok(())
}

fn print_likes(state: &LikeState) {
    let mark = if state.liked { "♥" } else { "♡" };
    println!("{} {}", mark, state.count);
}

/// Like a post, or take the like back
pub async fn like(app: &GitPost, post_id: &str) -> Result<()> {
    let likes = Likes::new(require_tree(app)?, device_id(app)?);
    print_likes(&likes.toggle(post_id).await?);
    Ok(())
}

pub async fn likes(app: &GitPost, post_id: &str) -> Result<()> {
    let likes = Likes::new(require_tree(app)?, device_id(app)?);
    print_likes(&likes.status(post_id).await?);
    Ok(())
}

/// Print the like state on every change until Ctrl-C
pub async fn watch_likes(app: &GitPost, post_id: &str) -> Result<()> {
    let likes = Likes::new(require_tree(app)?, device_id(app)?);
    let mut watch = likes.watch(post_id).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            next = watch.next() => match next {
                Some(state) => print_likes(&state),
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }
    watch.unsubscribe();
    Ok(())
}

fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments yet");
        return;
    }
    let now = Utc::now();
    for comment in comments {
        let mut meta = relative_date(comment.timestamp, now);
        if comment.edited {
            meta.push_str(" (edited)");
        }
        if comment.is_own {
            meta.push_str(" [yours]");
        }
        println!("{} - {}  {}", comment.author, meta, comment.id);
        for line in comment.text.lines() {
            println!("  {}", line);
        }
    }
}

fn comments(app: &GitPost) -> Result<Comments<RestTree>> {
    Ok(Comments::new(require_tree(app)?, device_id(app)?, &app.config))
}

pub async fn comment_add(app: &GitPost, post_id: &str, text: &str, author: Option<&str>) -> Result<()> {
    let comment = comments(app)?.add(post_id, text, author, Utc::now()).await?;
    println!("Comment added ({})", comment.id);
    Ok(())
}

pub async fn comment_list(app: &GitPost, post_id: &str) -> Result<()> {
    let list = comments(app)?.list(post_id).await?;
    println!("{} comments", list.len());
    print_comments(&list);
    Ok(())
}

/// Find a comment to learn who owns it
async fn find_comment(store: &Comments<RestTree>, post_id: &str, comment_id: &str) -> Result<Comment> {
    store
        .list(post_id)
        .await?
        .into_iter()
        .find(|c| c.id == comment_id)
        .with_context(|| format!("Comment {} not found", comment_id))
}

pub async fn comment_edit(app: &GitPost, post_id: &str, comment_id: &str, text: &str) -> Result<()> {
    let store = comments(app)?;
    let comment = find_comment(&store, post_id, comment_id).await?;
    store.edit(post_id, comment_id, &comment.user_id, text).await?;
    println!("Comment updated");
    Ok(())
}

pub async fn comment_delete(app: &GitPost, post_id: &str, comment_id: &str) -> Result<()> {
    let store = comments(app)?;
    let comment = find_comment(&store, post_id, comment_id).await?;
    store.delete(post_id, comment_id, &comment.user_id).await?;
    println!("Comment deleted");
    Ok(())
}

/// Reprint the comment list on every change until Ctrl-C
pub async fn comment_watch(app: &GitPost, post_id: &str) -> Result<()> {
    let mut watch = comments(app)?.watch(post_id).await?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            next = watch.next() => match next {
                Some(list) => {
                    println!("--- {} comments", list.len());
                    print_comments(&list);
                }
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }
    watch.unsubscribe();
    Ok(())
}
