//! Reader engagement - view counts, likes and comments

mod comments;
mod likes;
mod views;

pub use comments::{Comment, CommentWatch, Comments};
pub use likes::{LikeState, LikeWatch, Likes};
pub use views::{LocalViewCounter, ViewCounter, ViewOutcome};
