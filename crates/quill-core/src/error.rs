//! Error types for the quill backend.

use thiserror::Error;

/// Result type alias using quill's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quill operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found, or owned by a different user.
    ///
    /// Cross-owner access deliberately maps here rather than to a
    /// "forbidden" variant so callers cannot probe for existence.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input (missing/empty required fields)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource already exists (duplicate username, email, tag name)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authentication failed or missing
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
