use crate::validation::ValidationError;

use thiserror::Error;

/// Result type alias for roster-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the roster library
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Parse/serialization errors
    #[error("parse error: {0}")]
    Parse(String),

    /// A record failed validation
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
