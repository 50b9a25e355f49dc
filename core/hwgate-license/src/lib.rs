//! Entitlement ledger and activity registry for hwgate.
//!
//! This crate answers three questions about a hardware id:
//! - is it entitled right now ([`AuthorizationLedger::verify`])
//! - until when ([`VerifyOutcome::Authorized`])
//! - which of its instances are running ([`ActivityRegistry::snapshot`])
//!
//! # Design Principles
//!
//! - **Store is the source of truth**: the ledger re-reads the durable store
//!   on every call and writes the full file back with optimistic concurrency
//! - **Forgiving load**: malformed ledger rows are skipped and counted, never
//!   fatal
//! - **Day granularity**: a grant issued on day `d` for `n` days is active
//!   through day `d + n` inclusive
//! - **Ephemeral liveness**: heartbeat state lives in memory only and is
//!   pruned lazily when read

mod activity;
mod error;
mod file;
mod ledger;
mod record;

pub use activity::{
    ActivityRegistry, ActivityStatus, ActivitySummary, Snapshot, DEFAULT_INACTIVITY_THRESHOLD,
};
pub use error::{LedgerError, LedgerResult};
pub use file::{LedgerFile, MalformedReason, MalformedRecord, ParseReport, LEDGER_HEADER};
pub use ledger::{AuthorizationLedger, LedgerConfig, Listing, VerifyOutcome, DEFAULT_LEDGER_KEY};
pub use record::{AuthorizationRecord, ListedRecord, RecordStatus};
