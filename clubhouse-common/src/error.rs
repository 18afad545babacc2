//! Common error types for Clubhouse

use thiserror::Error;

/// Common result type for Clubhouse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Clubhouse crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the role or ownership required
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request collides with existing state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Outbound email or push delivery failed
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
