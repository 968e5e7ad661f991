//! Error types for Heroes Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// A collection changed between read and write-back
    #[error("Write conflict on '{key}': expected version {expected:?}, found {found:?}")]
    Conflict {
        key: String,
        expected: Option<i64>,
        found: Option<i64>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
