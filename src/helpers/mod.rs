//! Helper functions for URLs, dates and counters

mod date;
mod number;
mod url;

pub use date::*;
pub use number::*;
pub use url::*;
