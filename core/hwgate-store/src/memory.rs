//! In-process store, used for tests and ephemeral deployments.

use crate::error::{StoreError, StoreResult};
use crate::store::{DurableStore, VersionToken, VersionedBlob};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Slot {
    content: Vec<u8>,
    revision: u64,
}

/// Versioned blobs held in memory. Version tokens are per-key revision
/// counters.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, Slot>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with `key` already holding `content`.
    pub fn with_blob(key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let mut slots = HashMap::new();
        slots.insert(
            key.into(),
            Slot {
                content: content.into(),
                revision: 1,
            },
        );
        Self {
            slots: RwLock::new(slots),
        }
    }

    /// Number of successful writes applied to `key` (0 if absent).
    pub async fn revision(&self, key: &str) -> u64 {
        self.slots
            .read()
            .await
            .get(key)
            .map(|slot| slot.revision)
            .unwrap_or(0)
    }
}

fn token(revision: u64) -> VersionToken {
    VersionToken::new(format!("r{revision}"))
}

#[async_trait]
impl DurableStore for MemoryStore {
    fn provider_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        Ok(self.slots.read().await.get(key).map(|slot| VersionedBlob {
            content: slot.content.clone(),
            version: token(slot.revision),
        }))
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let mut slots = self.slots.write().await;
        let current = slots.get(key).map(|slot| token(slot.revision));
        if current.as_ref() != expected {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }

        let revision = slots.get(key).map(|slot| slot.revision).unwrap_or(0) + 1;
        slots.insert(
            key.to_string(),
            Slot {
                content: content.to_vec(),
                revision,
            },
        );
        Ok(token(revision))
    }
}
