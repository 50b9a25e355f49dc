//! Shared helpers for gateway and HTTP tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use hwgate_license::{ActivityRegistry, AuthorizationLedger, DEFAULT_INACTIVITY_THRESHOLD, LedgerConfig};
use hwgate_server::{Gateway, GatewayConfig, NotificationSink, NotifyError, NotifyResult, build_router};
use hwgate_store::{DurableStore, MemoryStore, StoreError, StoreResult, VersionToken, VersionedBlob};
use hwgate_types::ManualClock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADMIN_KEY: &str = "s3cret-admin";

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Everything a test may want to poke at behind one gateway.
pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub clock: Arc<ManualClock>,
    pub sink: Arc<RecordingSink>,
}

/// A gateway over a fresh memory store, clock pinned to 2025-06-01 noon.
pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(store: Arc<dyn DurableStore>) -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let (gateway, clock) = gateway_with(store, sink.clone());
    Harness {
        gateway,
        clock,
        sink,
    }
}

pub fn gateway_with(
    store: Arc<dyn DurableStore>,
    sink: Arc<dyn NotificationSink>,
) -> (Arc<Gateway>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_date(day(2025, 6, 1)));
    let ledger = Arc::new(AuthorizationLedger::new(
        store,
        clock.clone(),
        LedgerConfig {
            max_write_attempts: 3,
            store_timeout: Duration::from_secs(2),
            retry_backoff: Duration::ZERO,
            ..Default::default()
        },
    ));
    let registry = Arc::new(ActivityRegistry::new(
        clock.clone(),
        DEFAULT_INACTIVITY_THRESHOLD,
    ));
    let gateway = Gateway::new(
        ledger,
        registry,
        sink,
        GatewayConfig {
            admin_key: ADMIN_KEY.to_string(),
            notify_timeout: Duration::from_millis(200),
            ..Default::default()
        },
    );
    (Arc::new(gateway), clock)
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
pub async fn spawn_server(gateway: Arc<Gateway>) -> String {
    let app = build_router(gateway);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

/// Keeps every message it is given.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Polls until at least `n` messages arrived or two seconds pass.
    pub async fn wait_for(&self, n: usize) -> Vec<String> {
        for _ in 0..200 {
            let messages = self.messages();
            if messages.len() >= n {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.messages()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn emit(&self, message: &str) -> NotifyResult<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Fails every delivery.
pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn emit(&self, _message: &str) -> NotifyResult<()> {
        Err(NotifyError::Status(500))
    }
}

/// Never finishes a delivery.
pub struct HangingSink;

#[async_trait]
impl NotificationSink for HangingSink {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn emit(&self, _message: &str) -> NotifyResult<()> {
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

/// Reads fine, rejects every write as a conflict.
#[derive(Default)]
pub struct AlwaysConflictStore {
    inner: MemoryStore,
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
        Err(StoreError::Conflict {
            key: key.to_string(),
        })
    }
}
