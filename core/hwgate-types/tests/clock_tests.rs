use chrono::{Duration, NaiveDate, TimeZone, Utc};
use hwgate_types::{ClockSource, ManualClock, SystemClock};

#[test]
fn system_clock_is_close_to_now() {
    let before = Utc::now();
    let now = SystemClock.now();
    let after = Utc::now();
    assert!(before <= now && now <= after);
}

#[test]
fn manual_clock_stays_put() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    assert_eq!(clock.now(), start);
    assert_eq!(clock.now(), start);
}

#[test]
fn manual_clock_advance() {
    let start = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let clock = ManualClock::new(start);
    clock.advance(Duration::seconds(901));
    assert_eq!(clock.now(), start + Duration::seconds(901));
}

#[test]
fn manual_clock_set() {
    let clock = ManualClock::default();
    let target = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn manual_clock_at_date_reports_that_day() {
    let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
    let clock = ManualClock::at_date(date);
    assert_eq!(clock.today(), date);

    clock.advance(Duration::days(1));
    assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
}
