//! Error types shared by the library modules

use thiserror::Error;

/// Errors raised by gitpost operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or a value is out of bounds
    #[error("{0}")]
    Validation(String),

    /// The remote file or record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write lost against a concurrent writer
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user is not allowed to perform the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A remote call returned a non-success status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error means the target was already gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Http { status: 404, .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

/// Result alias for library operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(Error::NotFound("_posts/a.md".into()).is_not_found());
        assert!(Error::Http {
            status: 404,
            message: "Not Found".into()
        }
        .is_not_found());
        assert!(!Error::Http {
            status: 500,
            message: "boom".into()
        }
        .is_not_found());
        assert!(!Error::Validation("title".into()).is_not_found());
    }
}
