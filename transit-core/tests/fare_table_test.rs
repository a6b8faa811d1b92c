//! Fare matrix lookup tests
//!
//! Uses the Tejero - Pala-pala sample matrix, which mixes per-hop fares,
//! longer direct fares and a duplicated pair with a different price.

use transit_core::{Error, FareSegment, FareTable, Route};

fn sample_route() -> Route {
    Route::new(
        "Tejero - Pala-pala",
        [
            "Tejero Terminal",
            "Robinson Tejero",
            "Malabon",
            "Bayan Luma",
            "Anabu",
            "Pala-pala Terminal",
        ],
    )
    .unwrap()
}

fn sample_segments() -> Vec<FareSegment> {
    [
        ("Tejero Terminal", "Robinson Tejero", 12.0),
        ("Robinson Tejero", "Malabon", 12.0),
        ("Tejero Terminal", "Malabon", 13.0),
        ("Malabon", "Bayan Luma", 13.0),
        ("Bayan Luma", "Anabu", 14.0),
        ("Anabu", "Pala-pala Terminal", 15.0),
        ("Robinson Tejero", "Pala-pala Terminal", 25.0),
        ("Robinson Tejero", "Malabon", 14.0),
    ]
    .into_iter()
    .map(|(from, to, fare)| FareSegment::new(from, to, fare).unwrap())
    .collect()
}

fn sample_table() -> FareTable {
    FareTable::for_route(&sample_route(), sample_segments()).unwrap()
}

/// Test: every verbatim entry returns its own fare (first entry for duplicates)
#[test]
fn test_every_direct_entry_is_found() {
    let table = sample_table();

    for segment in sample_segments() {
        let expected = table
            .segments()
            .iter()
            .find(|s| s.from == segment.from && s.to == segment.to)
            .map(|s| s.fare);
        assert_eq!(table.lookup(&segment.from, &segment.to), expected);
    }
}

/// Test: the documented sample lookup
#[test]
fn test_robinson_to_malabon_is_twelve() {
    let table = sample_table();
    assert_eq!(table.lookup("Robinson Tejero", "Malabon"), Some(12.0));
}

/// Test: a pair with no direct entry is not found, even if hops would compose
#[test]
fn test_terminal_to_terminal_not_found() {
    let table = sample_table();
    assert_eq!(table.lookup("Tejero Terminal", "Pala-pala Terminal"), None);
}

/// Test: reverse direction is never inferred
#[test]
fn test_reverse_direction_not_found() {
    let table = sample_table();
    assert_eq!(table.lookup("Malabon", "Robinson Tejero"), None);
}

/// Test: names outside the table are a miss, not an error
#[test]
fn test_unknown_names_not_found() {
    let table = sample_table();
    assert_eq!(table.lookup("Nowhere", "Malabon"), None);
    assert_eq!(table.lookup("", ""), None);
}

/// Test: a route-bound table rejects entries for undeclared checkpoints
#[test]
fn test_for_route_rejects_unknown_checkpoint() {
    let segments = vec![FareSegment::new("Tejero Terminal", "Imus Plaza", 20.0).unwrap()];
    let result = FareTable::for_route(&sample_route(), segments);

    match result {
        Err(Error::UnknownCheckpoint { checkpoint, .. }) => assert_eq!(checkpoint, "Imus Plaza"),
        other => panic!("expected UnknownCheckpoint, got {:?}", other),
    }
}

/// Test: a route-bound table rejects self-loops
#[test]
fn test_for_route_rejects_same_endpoints() {
    let segments = vec![FareSegment::new("Malabon", "Malabon", 0.0).unwrap()];
    let result = FareTable::for_route(&sample_route(), segments);
    assert!(matches!(result, Err(Error::InvalidSegment { .. })));
}

/// Test: outgoing entries keep table order
#[test]
fn test_segments_from_in_table_order() {
    let table = sample_table();
    let destinations: Vec<&str> = table
        .segments_from("Robinson Tejero")
        .map(|s| s.to.as_str())
        .collect();

    assert_eq!(destinations, vec!["Malabon", "Pala-pala Terminal", "Malabon"]);
}

/// Test: segments deserialize from the admin JSON shape
#[test]
fn test_segment_from_json() {
    let segment: FareSegment = serde_json::from_value(serde_json::json!({
        "from": "Robinson Tejero",
        "to": "Malabon",
        "fare": 12
    }))
    .unwrap();

    let table = FareTable::from_segments([segment]).unwrap();
    assert_eq!(table.lookup("Robinson Tejero", "Malabon"), Some(12.0));
}
