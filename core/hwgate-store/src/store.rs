//! Durable store abstraction trait.
//!
//! A durable store is a key/value blob service with optimistic concurrency:
//! every read hands back a version token, and a write only lands if the
//! caller presents the token of the version it read.

use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque version marker returned by a store for one revision of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    /// Wraps a backend-specific version string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Content of a key together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBlob {
    pub content: Vec<u8>,
    pub version: VersionToken,
}

/// Abstract durable store interface.
///
/// Implementations must make each version visible atomically: a reader
/// sees either the previous content or the new content, never a mix.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Returns the name of the storage backend.
    fn provider_name(&self) -> &'static str;

    /// Reads a key. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>>;

    /// Writes a key if its current version equals `expected`.
    ///
    /// `expected = None` means the key must not exist yet. On mismatch the
    /// write is rejected with [`StoreError::Conflict`](crate::StoreError::Conflict).
    async fn put(
        &self,
        key: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken>;
}
