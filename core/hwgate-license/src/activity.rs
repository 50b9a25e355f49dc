//! In-memory liveness tracking for running instances.
//!
//! Each hardware id owns a map of instance id to last heartbeat. Nothing
//! here is persisted, and there is no background sweeper: stale instances
//! are pruned by [`ActivityRegistry::snapshot`], which reports how many it
//! removed in [`Snapshot::pruned_instances`].
//!
//! # Memory growth
//!
//! Entries are created on first heartbeat and never removed, so memory is
//! bounded by the number of distinct hardware ids ever reported to this
//! process. [`ActivityRegistry::tracked_entries`] exposes that count.

use chrono::{DateTime, TimeDelta, Utc};
use hwgate_types::{ClockSource, HardwareId, InstanceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Default heartbeat age after which an instance counts as gone.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(900);

/// Liveness as reported by a client, and as summarized per hardware id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Active,
    Inactive,
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Inactive => f.write_str("inactive"),
        }
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown activity status {other:?}")),
        }
    }
}

#[derive(Debug)]
struct ActivityEntry {
    instances: BTreeMap<InstanceId, DateTime<Utc>>,
    last_write: DateTime<Utc>,
}

impl ActivityEntry {
    fn last_activity(&self) -> DateTime<Utc> {
        self.instances
            .values()
            .max()
            .copied()
            .unwrap_or(self.last_write)
    }

    fn status(&self) -> ActivityStatus {
        if self.instances.is_empty() {
            ActivityStatus::Inactive
        } else {
            ActivityStatus::Active
        }
    }

    /// Removes instances whose heartbeat is at least `threshold` old.
    fn prune(&mut self, now: DateTime<Utc>, threshold: TimeDelta) -> usize {
        let stale: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(_, seen)| now - **seen >= threshold)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.instances.remove(id);
        }
        stale.len()
    }
}

/// Point-in-time summary of one hardware id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivitySummary {
    pub hardware_id: HardwareId,
    pub status: ActivityStatus,
    pub last_activity: DateTime<Utc>,
    pub instance_count: usize,
    pub instance_ids: Vec<InstanceId>,
}

/// Result of [`ActivityRegistry::snapshot`].
///
/// Taking a snapshot mutates the registry: stale instances are removed
/// before summarizing, and `pruned_instances` says how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    taken_at: DateTime<Utc>,
    pruned_instances: usize,
    entries: Vec<ActivitySummary>,
}

impl Snapshot {
    #[must_use]
    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Instances removed as stale by this snapshot.
    #[must_use]
    pub fn pruned_instances(&self) -> usize {
        self.pruned_instances
    }

    /// Every tracked hardware id, ordered by id.
    #[must_use]
    pub fn entries(&self) -> &[ActivitySummary] {
        &self.entries
    }

    /// Summary for a single hardware id.
    #[must_use]
    pub fn get(&self, hardware_id: &HardwareId) -> Option<&ActivitySummary> {
        self.entries
            .binary_search_by(|e| e.hardware_id.cmp(hardware_id))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Only the hardware ids with at least one live instance.
    pub fn active(&self) -> impl Iterator<Item = &ActivitySummary> {
        self.entries
            .iter()
            .filter(|e| e.status == ActivityStatus::Active)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Snapshot {
    type Item = ActivitySummary;
    type IntoIter = std::vec::IntoIter<ActivitySummary>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Heartbeat state for every hardware id seen by this process.
pub struct ActivityRegistry {
    clock: Arc<dyn ClockSource>,
    threshold: TimeDelta,
    entries: Mutex<BTreeMap<HardwareId, ActivityEntry>>,
}

impl ActivityRegistry {
    /// Creates an empty registry. A heartbeat older than `threshold` is stale.
    pub fn new(clock: Arc<dyn ClockSource>, threshold: Duration) -> Self {
        Self {
            clock,
            threshold: TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// The configured inactivity threshold.
    pub fn threshold(&self) -> Duration {
        self.threshold.to_std().unwrap_or(Duration::MAX)
    }

    // Every entry is self-consistent after each statement, so a panic while
    // the lock was held cannot leave a broken map behind.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<HardwareId, ActivityEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a status report from one instance.
    ///
    /// `Active` refreshes the instance's heartbeat, creating the entry on
    /// first contact. `Inactive` drops the instance; for an unknown hardware
    /// id it does nothing.
    pub fn report_activity(
        &self,
        hardware_id: &HardwareId,
        instance_id: &InstanceId,
        status: ActivityStatus,
    ) {
        let now = self.clock.now();
        let mut entries = self.lock();

        match status {
            ActivityStatus::Active => {
                let entry = entries
                    .entry(hardware_id.clone())
                    .or_insert_with(|| ActivityEntry {
                        instances: BTreeMap::new(),
                        last_write: now,
                    });
                entry.instances.insert(instance_id.clone(), now);
                entry.last_write = now;
            }
            ActivityStatus::Inactive => {
                let Some(entry) = entries.get_mut(hardware_id) else {
                    debug!("Inactive report for unknown {}: ignored", hardware_id);
                    return;
                };
                entry.instances.remove(instance_id);
                entry.last_write = now;
                if entry.instances.is_empty() {
                    debug!("{} has no live instances", hardware_id);
                }
            }
        }
    }

    /// Same as `report_activity(.., ActivityStatus::Active)`.
    pub fn heartbeat(&self, hardware_id: &HardwareId, instance_id: &InstanceId) {
        self.report_activity(hardware_id, instance_id, ActivityStatus::Active);
    }

    /// Prunes stale instances, then summarizes every hardware id.
    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now();
        let mut entries = self.lock();
        let mut pruned_instances = 0;

        let summaries = entries
            .iter_mut()
            .map(|(hardware_id, entry)| {
                let pruned = entry.prune(now, self.threshold);
                if pruned > 0 {
                    debug!("Pruned {} stale instance(s) of {}", pruned, hardware_id);
                }
                pruned_instances += pruned;
                ActivitySummary {
                    hardware_id: hardware_id.clone(),
                    status: entry.status(),
                    last_activity: entry.last_activity(),
                    instance_count: entry.instances.len(),
                    instance_ids: entry.instances.keys().cloned().collect(),
                }
            })
            .collect();

        Snapshot {
            taken_at: now,
            pruned_instances,
            entries: summaries,
        }
    }

    /// Number of hardware ids held in memory, live or not.
    pub fn tracked_entries(&self) -> usize {
        self.lock().len()
    }
}
