//! Error types for the ledger.

use thiserror::Error;

/// Ledger-specific errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Caller supplied an out-of-range or malformed value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Every optimistic write attempt lost to a concurrent writer.
    #[error("store conflict: gave up after {attempts} attempts")]
    StoreConflict { attempts: u32 },

    /// The durable store timed out or could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LedgerError {
    /// Returns true if the failure was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
