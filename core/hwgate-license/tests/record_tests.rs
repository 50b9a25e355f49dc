mod common;

use common::{day, hw};
use hwgate_license::{AuthorizationRecord, LedgerError, RecordStatus};

// ── AuthorizationRecord ─────────────────────────────────────────

#[test]
fn expiration_is_issue_plus_days() {
    let record = AuthorizationRecord::new(hw("HW1"), day(2025, 1, 15), 30).unwrap();
    assert_eq!(record.expiration_date(), day(2025, 2, 14));
    assert_eq!(record.validity_days(), 30);
    assert_eq!(record.issued_date(), day(2025, 1, 15));
}

#[test]
fn expiration_crosses_leap_day() {
    let record = AuthorizationRecord::new(hw("HW1"), day(2024, 2, 28), 2).unwrap();
    assert_eq!(record.expiration_date(), day(2024, 3, 1));
}

#[test]
fn zero_days_expires_same_day() {
    let record = AuthorizationRecord::new(hw("HW1"), day(2025, 1, 15), 0).unwrap();
    assert_eq!(record.expiration_date(), day(2025, 1, 15));
    assert_eq!(record.status_on(day(2025, 1, 15)), RecordStatus::Active);
    assert_eq!(record.status_on(day(2025, 1, 16)), RecordStatus::Expired);
}

#[test]
fn overflowing_expiration_is_rejected() {
    assert!(AuthorizationRecord::new(hw("HW1"), day(9999, 1, 1), u32::MAX).is_none());
}

#[test]
fn status_is_inclusive_of_expiration_day() {
    let record = AuthorizationRecord::new(hw("HW1"), day(2025, 1, 1), 10).unwrap();
    assert_eq!(record.status_on(day(2024, 12, 31)), RecordStatus::Active);
    assert_eq!(record.status_on(day(2025, 1, 11)), RecordStatus::Active);
    assert_eq!(record.status_on(day(2025, 1, 12)), RecordStatus::Expired);
}

#[test]
fn days_remaining() {
    let record = AuthorizationRecord::new(hw("HW1"), day(2025, 1, 1), 10).unwrap();
    assert_eq!(record.days_remaining(day(2025, 1, 1)), 10);
    assert_eq!(record.days_remaining(day(2025, 1, 11)), 0);
    assert_eq!(record.days_remaining(day(2025, 1, 14)), -3);
}

#[test]
fn record_status_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&RecordStatus::Expired).unwrap(),
        "\"expired\""
    );
}

// ── LedgerError ─────────────────────────────────────────────────

#[test]
fn error_display() {
    assert_eq!(
        LedgerError::Validation("validity_days must not be negative".into()).to_string(),
        "validation error: validity_days must not be negative"
    );
    assert_eq!(
        LedgerError::StoreConflict { attempts: 5 }.to_string(),
        "store conflict: gave up after 5 attempts"
    );
    assert_eq!(
        LedgerError::StoreUnavailable("timed out".into()).to_string(),
        "store unavailable: timed out"
    );
}

#[test]
fn only_validation_is_client_error() {
    assert!(LedgerError::Validation(String::new()).is_client_error());
    assert!(!LedgerError::StoreConflict { attempts: 1 }.is_client_error());
    assert!(!LedgerError::StoreUnavailable(String::new()).is_client_error());
}
