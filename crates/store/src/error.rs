//! Error types for the record store

use roster_core::ValidationError;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record was rejected before anything was written
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Database corruption or schema mismatch
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    ConnectionError(#[from] tokio_rusqlite::Error),
}

impl Error {
    /// Create a database error with a message
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// The validation failure behind this error, if that is what it is
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
