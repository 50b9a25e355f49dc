//! Authorization records.

use chrono::{Days, NaiveDate};
use hwgate_types::HardwareId;
use serde::{Deserialize, Serialize};

/// Whether a record still grants access on a given day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Expired,
}

/// A time-bounded entitlement for one hardware id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRecord {
    hardware_id: HardwareId,
    issued_date: NaiveDate,
    validity_days: u32,
    expiration_date: NaiveDate,
}

impl AuthorizationRecord {
    /// Builds a record, or `None` if the expiration date would fall outside
    /// the representable calendar.
    #[must_use]
    pub fn new(hardware_id: HardwareId, issued_date: NaiveDate, validity_days: u32) -> Option<Self> {
        let expiration_date = issued_date.checked_add_days(Days::new(u64::from(validity_days)))?;
        Some(Self {
            hardware_id,
            issued_date,
            validity_days,
            expiration_date,
        })
    }

    #[must_use]
    pub fn hardware_id(&self) -> &HardwareId {
        &self.hardware_id
    }

    #[must_use]
    pub fn issued_date(&self) -> NaiveDate {
        self.issued_date
    }

    #[must_use]
    pub fn validity_days(&self) -> u32 {
        self.validity_days
    }

    /// `issued_date + validity_days`. The last day on which the record is active.
    #[must_use]
    pub fn expiration_date(&self) -> NaiveDate {
        self.expiration_date
    }

    /// Active through the expiration date inclusive.
    #[must_use]
    pub fn status_on(&self, today: NaiveDate) -> RecordStatus {
        if today <= self.expiration_date {
            RecordStatus::Active
        } else {
            RecordStatus::Expired
        }
    }

    /// Whole days left until expiration (0 on the last day, negative once expired).
    #[must_use]
    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.expiration_date - today).num_days()
    }
}

/// A record as reported by [`AuthorizationLedger::list`](crate::AuthorizationLedger::list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedRecord {
    pub hardware_id: HardwareId,
    pub issued_date: NaiveDate,
    pub validity_days: u32,
    pub expiration_date: NaiveDate,
    pub status: RecordStatus,
}

impl ListedRecord {
    pub(crate) fn from_record(record: AuthorizationRecord, today: NaiveDate) -> Self {
        let status = record.status_on(today);
        Self {
            hardware_id: record.hardware_id,
            issued_date: record.issued_date,
            validity_days: record.validity_days,
            expiration_date: record.expiration_date,
            status,
        }
    }
}
