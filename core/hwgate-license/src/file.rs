//! The ledger file format.
//!
//! ```text
//! hardware_id,issued_date,validity_days
//! HW-0001,2025-01-15,30
//! HW-0002,2025-02-01,365
//! ```
//!
//! The same bytes are mirrored verbatim to the durable store, and other
//! deployments may read the file, so the layout (field order, `YYYY-MM-DD`
//! dates, `,` delimiter, `\n` line ends) must not change.
//!
//! Loading is forgiving: a bad row is skipped and reported in the
//! [`ParseReport`] instead of failing the whole load. The rows are then
//! gone from the in-memory view, and the next write drops them from the
//! file for good.

use crate::record::AuthorizationRecord;
use chrono::NaiveDate;
use hwgate_types::{HardwareId, IdError};
use std::fmt::Write as _;
use thiserror::Error;

/// First line of every ledger file.
pub const LEDGER_HEADER: &str = "hardware_id,issued_date,validity_days";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Why a ledger row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedReason {
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),

    #[error("invalid hardware id: {0}")]
    InvalidId(#[from] IdError),

    #[error("invalid issued date {0:?}")]
    IssuedDate(String),

    #[error("invalid validity days {0:?}")]
    ValidityDays(String),

    #[error("expiration date out of range")]
    ExpirationOverflow,

    #[error("duplicate hardware id {0}; later row kept")]
    Duplicate(HardwareId),
}

/// One skipped row of a ledger file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {reason}")]
pub struct MalformedRecord {
    /// 1-based line number in the file.
    pub line: usize,
    pub reason: MalformedReason,
}

/// Diagnostics from one parse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub malformed: Vec<MalformedRecord>,
}

impl ParseReport {
    /// Number of rows skipped.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.malformed.len()
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// The full record set, in stored order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFile {
    records: Vec<AuthorizationRecord>,
}

impl LedgerFile {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses ledger text, skipping blank lines, the header and bad rows.
    #[must_use]
    pub fn parse(text: &str) -> (Self, ParseReport) {
        let mut file = Self::new();
        let mut report = ParseReport::default();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || (idx == 0 && line == LEDGER_HEADER) {
                continue;
            }
            match parse_line(line) {
                Ok(record) => {
                    let id = record.hardware_id().clone();
                    if file.upsert(record).is_some() {
                        report.malformed.push(MalformedRecord {
                            line: idx + 1,
                            reason: MalformedReason::Duplicate(id),
                        });
                    }
                }
                Err(reason) => report.malformed.push(MalformedRecord {
                    line: idx + 1,
                    reason,
                }),
            }
        }

        (file, report)
    }

    /// Serializes the full set, header first.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(LEDGER_HEADER.len() + 1 + self.records.len() * 32);
        out.push_str(LEDGER_HEADER);
        out.push('\n');
        for record in &self.records {
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "{},{},{}",
                record.hardware_id(),
                record.issued_date().format(DATE_FORMAT),
                record.validity_days()
            );
        }
        out
    }

    /// Inserts or replaces the record for its hardware id. A replaced record
    /// keeps its position. Returns the previous record, if any.
    pub fn upsert(&mut self, record: AuthorizationRecord) -> Option<AuthorizationRecord> {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.hardware_id() == record.hardware_id())
        {
            Some(slot) => Some(std::mem::replace(slot, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    /// Removes the record for `hardware_id`, if present.
    pub fn remove(&mut self, hardware_id: &HardwareId) -> Option<AuthorizationRecord> {
        let pos = self
            .records
            .iter()
            .position(|r| r.hardware_id() == hardware_id)?;
        Some(self.records.remove(pos))
    }

    #[must_use]
    pub fn get(&self, hardware_id: &HardwareId) -> Option<&AuthorizationRecord> {
        self.records.iter().find(|r| r.hardware_id() == hardware_id)
    }

    #[must_use]
    pub fn records(&self) -> &[AuthorizationRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<AuthorizationRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Checks that `hardware_id` can be written as the first field of a ledger
/// line and read back as the same id.
pub(crate) fn check_storable(hardware_id: &HardwareId) -> Result<(), String> {
    let raw = hardware_id.as_str();
    if let Some(found) = raw.chars().find(|c| matches!(c, ',' | '\n' | '\r')) {
        return Err(format!("hardware_id must not contain {found:?}"));
    }
    if raw.trim() != raw {
        return Err("hardware_id must not start or end with whitespace".to_string());
    }
    Ok(())
}

fn parse_line(line: &str) -> Result<AuthorizationRecord, MalformedReason> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [id, date, days] = fields.as_slice() else {
        return Err(MalformedReason::FieldCount(fields.len()));
    };

    let hardware_id = HardwareId::parse(*id)?;
    let issued_date = NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|_| MalformedReason::IssuedDate((*date).to_string()))?;
    let validity_days: u32 = days
        .parse()
        .map_err(|_| MalformedReason::ValidityDays((*days).to_string()))?;

    AuthorizationRecord::new(hardware_id, issued_date, validity_days)
        .ok_or(MalformedReason::ExpirationOverflow)
}
