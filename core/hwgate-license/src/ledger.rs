//! The authorization ledger.
//!
//! The durable store is the source of truth; the ledger keeps no cached
//! copy. Every mutation is a read-modify-write of the whole file guarded by
//! the store's version token, retried a bounded number of times when
//! another writer gets there first. Within one process, mutations are also
//! serialized through a local async mutex, so version conflicts can only
//! come from other processes sharing the store.

use crate::error::{LedgerError, LedgerResult};
use crate::file::{self, LedgerFile};
use crate::record::{AuthorizationRecord, ListedRecord, RecordStatus};
use chrono::NaiveDate;
use hwgate_store::{DurableStore, StoreError, StoreResult, VersionToken};
use hwgate_types::{ClockSource, HardwareId};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Key the ledger file lives under unless configured otherwise.
pub const DEFAULT_LEDGER_KEY: &str = "hardware_ids.txt";

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Store key holding the ledger file.
    pub store_key: String,
    /// Total read-modify-write attempts before giving up on conflicts.
    pub max_write_attempts: u32,
    /// Upper bound on each individual store call.
    pub store_timeout: Duration,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            store_key: DEFAULT_LEDGER_KEY.to_string(),
            max_write_attempts: 5,
            store_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_millis(25),
        }
    }
}

/// Answer to "is this hardware id entitled right now?".
///
/// Deliberately two-state: a hardware id that was never authorized and one
/// whose grant lapsed both come back as `NotAuthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerifyOutcome {
    Authorized { expiration_date: NaiveDate },
    NotAuthorized,
}

impl VerifyOutcome {
    #[must_use]
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

/// Lazy view over every record, each annotated with its status as of the
/// day the listing was taken.
#[derive(Debug)]
pub struct Listing {
    records: std::vec::IntoIter<AuthorizationRecord>,
    today: NaiveDate,
}

impl Listing {
    /// The day statuses are computed against.
    #[must_use]
    pub fn as_of(&self) -> NaiveDate {
        self.today
    }
}

impl Iterator for Listing {
    type Item = ListedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.records
            .next()
            .map(|record| ListedRecord::from_record(record, self.today))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.records.size_hint()
    }
}

impl ExactSizeIterator for Listing {}

/// Durable set of authorization records.
pub struct AuthorizationLedger {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn ClockSource>,
    config: LedgerConfig,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
    malformed_rows: AtomicU64,
}

impl AuthorizationLedger {
    /// Creates a ledger over `store`.
    pub fn new(
        store: Arc<dyn DurableStore>,
        clock: Arc<dyn ClockSource>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            write_lock: Mutex::new(()),
            malformed_rows: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Cumulative count of malformed rows skipped across every load.
    pub fn malformed_rows_seen(&self) -> u64 {
        self.malformed_rows.load(Ordering::Relaxed)
    }

    /// Grants `hardware_id` access for `validity_days` days starting today,
    /// replacing any existing grant.
    pub async fn authorize(
        &self,
        hardware_id: &HardwareId,
        validity_days: i64,
    ) -> LedgerResult<AuthorizationRecord> {
        let today = self.clock.today();
        self.authorize_on(hardware_id, validity_days, today).await
    }

    /// Like [`authorize`](Self::authorize) with an explicit issue date.
    pub async fn authorize_on(
        &self,
        hardware_id: &HardwareId,
        validity_days: i64,
        issued_date: NaiveDate,
    ) -> LedgerResult<AuthorizationRecord> {
        file::check_storable(hardware_id).map_err(LedgerError::Validation)?;
        let days = u32::try_from(validity_days).map_err(|_| {
            LedgerError::Validation(format!(
                "validity_days must be between 0 and {}, got {validity_days}",
                u32::MAX
            ))
        })?;
        let record = AuthorizationRecord::new(hardware_id.clone(), issued_date, days)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "expiration date out of range for {days} days from {issued_date}"
                ))
            })?;

        let previous = self
            .mutate(|file| {
                let previous = file.upsert(record.clone());
                (previous, true)
            })
            .await?;

        match previous {
            Some(old) => info!(
                "Renewed {} until {} (was {})",
                hardware_id,
                record.expiration_date(),
                old.expiration_date()
            ),
            None => info!("Authorized {} until {}", hardware_id, record.expiration_date()),
        }
        Ok(record)
    }

    /// Removes the grant for `hardware_id`. Returns whether one existed;
    /// revoking an unknown id succeeds without touching the store.
    pub async fn revoke(&self, hardware_id: &HardwareId) -> LedgerResult<bool> {
        let removed = self
            .mutate(|file| {
                let removed = file.remove(hardware_id).is_some();
                (removed, removed)
            })
            .await?;

        if removed {
            info!("Revoked {}", hardware_id);
        } else {
            debug!("Revoke for {}: no record", hardware_id);
        }
        Ok(removed)
    }

    /// Checks whether `hardware_id` is entitled today.
    pub async fn verify(&self, hardware_id: &HardwareId) -> LedgerResult<VerifyOutcome> {
        let (file, _) = self.load().await?;
        let today = self.clock.today();

        let outcome = match file.get(hardware_id) {
            Some(record) if record.status_on(today) == RecordStatus::Active => {
                VerifyOutcome::Authorized {
                    expiration_date: record.expiration_date(),
                }
            }
            Some(record) => {
                debug!(
                    "Verify {}: expired on {}",
                    hardware_id,
                    record.expiration_date()
                );
                VerifyOutcome::NotAuthorized
            }
            None => {
                debug!("Verify {}: never authorized", hardware_id);
                VerifyOutcome::NotAuthorized
            }
        };
        Ok(outcome)
    }

    /// Lists every record with its current status. Each call re-reads the
    /// store; order is the stored order.
    pub async fn list(&self) -> LedgerResult<Listing> {
        let (file, _) = self.load().await?;
        Ok(Listing {
            records: file.into_records().into_iter(),
            today: self.clock.today(),
        })
    }

    /// Reads and parses the ledger file, returning the version it was read at
    /// (`None` if the file does not exist yet).
    async fn load(&self) -> LedgerResult<(LedgerFile, Option<VersionToken>)> {
        let key = &self.config.store_key;
        let Some(blob) = self.bounded(self.store.get(key)).await? else {
            return Ok((LedgerFile::new(), None));
        };

        let text = String::from_utf8_lossy(&blob.content);
        let (file, report) = LedgerFile::parse(&text);
        if !report.is_clean() {
            self.malformed_rows
                .fetch_add(report.malformed_count() as u64, Ordering::Relaxed);
            for bad in &report.malformed {
                warn!("Skipping malformed ledger row in {}: {}", key, bad);
            }
        }
        Ok((file, Some(blob.version)))
    }

    /// Runs one read-modify-write cycle, retrying on version conflicts.
    ///
    /// `apply` returns the operation's result and whether the file changed;
    /// an unchanged file is not written back.
    async fn mutate<T>(
        &self,
        mut apply: impl FnMut(&mut LedgerFile) -> (T, bool),
    ) -> LedgerResult<T> {
        let _guard = self.write_lock.lock().await;
        let key = &self.config.store_key;
        let attempts = self.config.max_write_attempts.max(1);

        for attempt in 1..=attempts {
            let (mut file, version) = self.load().await?;
            let (outcome, changed) = apply(&mut file);
            if !changed {
                return Ok(outcome);
            }

            let rendered = file.render();
            let write = self
                .store
                .put(key, rendered.as_bytes(), version.as_ref());
            match self.bounded(write).await {
                Ok(_) => return Ok(outcome),
                Err(LedgerError::StoreConflict { .. }) => {
                    warn!(
                        "Ledger write to {} lost a race (attempt {}/{})",
                        key, attempt, attempts
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(LedgerError::StoreConflict { attempts })
    }

    /// Applies the store timeout and maps store failures.
    async fn bounded<T>(&self, call: impl Future<Output = StoreResult<T>>) -> LedgerResult<T> {
        match tokio::time::timeout(self.config.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StoreError::Conflict { .. })) => Err(LedgerError::StoreConflict { attempts: 1 }),
            Ok(Err(e)) => Err(LedgerError::StoreUnavailable(format!(
                "{}: {e}",
                self.store.provider_name()
            ))),
            Err(_) => Err(LedgerError::StoreUnavailable(format!(
                "{} did not answer within {:?}",
                self.store.provider_name(),
                self.config.store_timeout
            ))),
        }
    }
}
