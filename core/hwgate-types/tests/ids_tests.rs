use hwgate_types::{HardwareId, IdError, InstanceId};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── HardwareId ────────────────────────────────────────────────────

#[test]
fn hardware_id_parse_keeps_value() {
    let id = HardwareId::parse("HW-0001").unwrap();
    assert_eq!(id.as_str(), "HW-0001");
    assert_eq!(id.to_string(), "HW-0001");
}

#[test]
fn hardware_id_is_case_sensitive() {
    let upper = HardwareId::parse("ABC").unwrap();
    let lower = HardwareId::parse("abc").unwrap();
    assert_ne!(upper, lower);
}

#[test]
fn hardware_id_empty_rejected() {
    assert_eq!(
        HardwareId::parse("").unwrap_err(),
        IdError::Empty { kind: "hardware_id" }
    );
}

#[test]
fn hardware_id_keeps_surrounding_whitespace() {
    let padded = HardwareId::parse(" HW1").unwrap();
    assert_eq!(padded.as_str(), " HW1");
    assert_ne!(padded, HardwareId::parse("HW1").unwrap());
}

#[test]
fn hardware_id_accepts_delimiters() {
    // Ledger line-format limits are enforced where records are written.
    assert_eq!(HardwareId::parse("a,b").unwrap().as_str(), "a,b");
    assert!(HardwareId::parse("a\nb").is_ok());
    assert!(HardwareId::parse("   ").is_ok());
}

#[test]
fn hardware_id_from_str() {
    let id = HardwareId::from_str("XYZ").unwrap();
    assert_eq!(id.as_str(), "XYZ");
}

#[test]
fn hardware_id_serde_transparent() {
    let id = HardwareId::parse("HW1").unwrap();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"HW1\"");
    let back: HardwareId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn hardware_id_serde_rejects_empty() {
    assert!(serde_json::from_str::<HardwareId>("\"\"").is_err());
}

#[test]
fn hardware_id_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(HardwareId::parse("HW1").unwrap());
    set.insert(HardwareId::parse("HW1").unwrap());
    assert_eq!(set.len(), 1);
}

#[test]
fn error_display_mentions_field() {
    let err = HardwareId::parse("").unwrap_err();
    assert!(format!("{err}").contains("hardware_id"));
}

// ── InstanceId ────────────────────────────────────────────────────

#[test]
fn instance_id_parse() {
    let id = InstanceId::parse("proc-1").unwrap();
    assert_eq!(id.as_str(), "proc-1");
}

#[test]
fn instance_id_empty_rejected() {
    assert_eq!(
        InstanceId::parse("").unwrap_err(),
        IdError::Empty { kind: "instance_id" }
    );
}

#[test]
fn instance_id_is_opaque() {
    // Instance ids never reach the ledger file, so delimiters are fine.
    assert!(InstanceId::parse("pid=12,host=a").is_ok());
}

// ── Properties ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn valid_hardware_ids_roundtrip_through_display(raw in "[A-Za-z0-9_:.-]{1,40}") {
        let id = HardwareId::parse(raw.clone()).unwrap();
        prop_assert_eq!(id.to_string(), raw);
    }
}
