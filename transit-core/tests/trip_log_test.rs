//! QR trip logging tests

use chrono::{TimeZone, Utc};
use transit_core::{Error, FareSegment, FareTable, TripLog};

fn table() -> FareTable {
    FareTable::from_segments([FareSegment::new("Robinson Tejero", "Malabon", 12.0).unwrap()])
        .unwrap()
}

/// Test: a scan for a priced pair carries the fare
#[test]
fn test_scan_with_known_fare() {
    let at = Utc.with_ymd_and_hms(2026, 10, 16, 7, 30, 0).unwrap();
    let log =
        TripLog::record("jeepney:NXA 1234", "Robinson Tejero", "Malabon", &table(), at).unwrap();

    assert_eq!(log.plate_number, "NXA 1234");
    assert_eq!(log.fare, Some(12.0));
    assert_eq!(log.scanned_at, at);
}

/// Test: a fare miss still records the trip
#[test]
fn test_scan_with_unknown_fare() {
    let log = TripLog::record(
        "jeepney:NXA-1234",
        "Tejero Terminal",
        "Pala-pala Terminal",
        &table(),
        Utc::now(),
    )
    .unwrap();

    assert_eq!(log.plate_number, "NXA 1234");
    assert_eq!(log.fare, None);
}

/// Test: a QR code that is not a jeepney code is rejected
#[test]
fn test_foreign_qr_rejected() {
    let result = TripLog::record("https://example.com", "A", "B", &table(), Utc::now());
    assert!(matches!(result, Err(Error::InvalidQrPayload(_))));
}

/// Test: trip logs serialize for local storage
#[test]
fn test_log_serializes() {
    let at = Utc.with_ymd_and_hms(2026, 10, 16, 7, 30, 0).unwrap();
    let log =
        TripLog::record("jeepney:NXA 1234", "Robinson Tejero", "Malabon", &table(), at).unwrap();
    let json = serde_json::to_value(&log).unwrap();

    assert_eq!(json["plate_number"], "NXA 1234");
    assert_eq!(json["fare"], 12.0);
}
