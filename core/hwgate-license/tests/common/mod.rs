//! Shared test helpers for ledger and registry tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use hwgate_license::{AuthorizationLedger, LedgerConfig};
use hwgate_store::{DurableStore, MemoryStore, StoreError, StoreResult, VersionToken, VersionedBlob};
use hwgate_types::{HardwareId, InstanceId, ManualClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

pub const KEY: &str = "hardware_ids.txt";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn hw(raw: &str) -> HardwareId {
    HardwareId::parse(raw).unwrap()
}

pub fn inst(raw: &str) -> InstanceId {
    InstanceId::parse(raw).unwrap()
}

/// Config with no retry delay, so conflict tests run instantly.
pub fn fast_config() -> LedgerConfig {
    LedgerConfig {
        retry_backoff: Duration::ZERO,
        ..Default::default()
    }
}

/// A ledger over a fresh in-memory store with the clock pinned to `today`.
pub fn ledger_on(
    today: NaiveDate,
) -> (Arc<AuthorizationLedger>, Arc<ManualClock>, Arc<MemoryStore>) {
    let clock = Arc::new(ManualClock::at_date(today));
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(AuthorizationLedger::new(
        store.clone(),
        clock.clone(),
        fast_config(),
    ));
    (ledger, clock, store)
}

/// Reads the raw ledger text out of a store.
pub async fn stored_text(store: &dyn DurableStore) -> Option<String> {
    store
        .get(KEY)
        .await
        .unwrap()
        .map(|blob| String::from_utf8(blob.content).unwrap())
}

/// Simulates another process: before rejecting each of the first
/// `conflicts` writes, it sneaks its own row into the file.
pub struct RivalStore {
    pub inner: MemoryStore,
    conflicts: AtomicU32,
    rival_writes: AtomicU32,
}

impl RivalStore {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            conflicts: AtomicU32::new(conflicts),
            rival_writes: AtomicU32::new(0),
        }
    }

    pub fn rival_writes(&self) -> u32 {
        self.rival_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DurableStore for RivalStore {
    fn provider_name(&self) -> &'static str {
        "rival"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        content: &[u8],
        expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        let remaining = self.conflicts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.conflicts.store(remaining - 1, Ordering::SeqCst);
            let n = self.rival_writes.fetch_add(1, Ordering::SeqCst) + 1;

            let current = self.inner.get(key).await?;
            let mut text = match &current {
                Some(blob) => String::from_utf8(blob.content.clone()).unwrap(),
                None => "hardware_id,issued_date,validity_days\n".to_string(),
            };
            text.push_str(&format!("RIVAL-{n},2025-01-01,10\n"));
            self.inner
                .put(key, text.as_bytes(), current.as_ref().map(|b| &b.version))
                .await?;
        }
        self.inner.put(key, content, expected).await
    }
}

/// Rejects every write as a conflict.
#[derive(Default)]
pub struct AlwaysConflictStore {
    pub inner: MemoryStore,
    pub puts: AtomicU32,
}

#[async_trait]
impl DurableStore for AlwaysConflictStore {
    fn provider_name(&self) -> &'static str {
        "always-conflict"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        _content: &[u8],
        _expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Conflict {
            key: key.to_string(),
        })
    }
}

/// Never answers.
pub struct HangingStore;

#[async_trait]
impl DurableStore for HangingStore {
    fn provider_name(&self) -> &'static str {
        "hanging"
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<VersionedBlob>> {
        std::future::pending().await
    }

    async fn put(
        &self,
        _key: &str,
        _content: &[u8],
        _expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        std::future::pending().await
    }
}

/// Reads fine, but writes hang forever.
pub struct StuckWriterStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DurableStore for StuckWriterStore {
    fn provider_name(&self) -> &'static str {
        "stuck-writer"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<VersionedBlob>> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        _key: &str,
        _content: &[u8],
        _expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        std::future::pending().await
    }
}

/// Fails every call.
pub struct DownStore;

#[async_trait]
impl DurableStore for DownStore {
    fn provider_name(&self) -> &'static str {
        "down"
    }

    async fn get(&self, _key: &str) -> StoreResult<Option<VersionedBlob>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put(
        &self,
        _key: &str,
        _content: &[u8],
        _expected: Option<&VersionToken>,
    ) -> StoreResult<VersionToken> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}
