//! Error types for the storage layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The expected version no longer matches; another writer won.
    #[error("version conflict on {key}")]
    Conflict { key: String },

    /// The backend could not be reached or answered with a failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// IO error (file system backend).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed response payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if this error is an optimistic-concurrency rejection.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}
