//! Error types for the gateway.

use hwgate_license::LedgerError;
use hwgate_types::IdError;
use thiserror::Error;

/// Request-level failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The administrative secret did not match.
    #[error("invalid admin key")]
    Unauthorized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<IdError> for GatewayError {
    fn from(err: IdError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl GatewayError {
    /// Returns true if the failure was caused by the caller's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Unauthorized => true,
            Self::Ledger(err) => err.is_client_error(),
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
