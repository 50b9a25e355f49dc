//! Core type definitions for hwgate.
//!
//! This crate defines the small, dependency-light types shared by the
//! ledger, the activity registry and the HTTP gateway:
//! - Hardware and instance identifiers (opaque, non-empty strings)
//! - The injectable wall-clock source

mod clock;
mod ids;

pub use clock::{ClockSource, ManualClock, SystemClock};
pub use ids::{HardwareId, InstanceId};

/// Errors raised when constructing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
}
