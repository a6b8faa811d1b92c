//! Tests for the jeepney fleet endpoints

mod common;

use common::{create_route, create_synced_user, create_test_server};
use serde_json::{json, Value};

/// Test: a jeepney with a route and driver is registered
#[tokio::test]
async fn test_create_jeepney() {
    let server = create_test_server();
    let route_id = create_route(&server, "Tejero - Pala-pala", &["Tejero Terminal"]).await;
    let driver_id = create_synced_user(&server, "auth0|d1", "driver@example.ph", "driver").await;

    let response = server
        .post("/api/jeepneys")
        .json(&json!({
            "plate_number": "nyt-4821",
            "route_id": route_id,
            "driver_id": driver_id,
            "capacity": 22,
        }))
        .await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["plate_number"], "NYT 4821");
    assert_eq!(body["route_id"], route_id);
    assert_eq!(body["driver_id"], driver_id);
    assert_eq!(body["active"], true);
}

/// Test: plate, capacity, route and driver are all checked
#[tokio::test]
async fn test_create_jeepney_validation() {
    let server = create_test_server();
    let passenger_id =
        create_synced_user(&server, "auth0|p1", "rider@example.ph", "passenger").await;

    let response = server
        .post("/api/jeepneys")
        .json(&json!({
            "plate_number": "4821",
            "route_id": 77,
            "driver_id": passenger_id,
            "capacity": 0,
        }))
        .await;

    assert_eq!(response.status_code(), 422);
    let fields = &response.json::<Value>()["fields"];
    assert!(fields["plate_number"].is_string());
    assert!(fields["capacity"].is_string());
    assert!(fields["route_id"].is_string());
    assert_eq!(fields["driver_id"], "User is not a driver");
}

/// Test: capacity above the limit is rejected
#[tokio::test]
async fn test_capacity_upper_bound() {
    let server = create_test_server();

    let response = server
        .post("/api/jeepneys")
        .json(&json!({ "plate_number": "ABC 123", "capacity": 41 }))
        .await;

    assert_eq!(response.status_code(), 422);
}

/// Test: plate numbers are unique
#[tokio::test]
async fn test_duplicate_plate_conflict() {
    let server = create_test_server();

    let first = server
        .post("/api/jeepneys")
        .json(&json!({ "plate_number": "ABC 1234", "capacity": 20 }))
        .await;
    assert_eq!(first.status_code(), 201);

    let second = server
        .post("/api/jeepneys")
        .json(&json!({ "plate_number": "abc 1234", "capacity": 18 }))
        .await;
    assert_eq!(second.status_code(), 409);
}

/// Test: separator variants of one plate are the same plate
#[tokio::test]
async fn test_plate_spellings_conflict() {
    let server = create_test_server();

    let first = server
        .post("/api/jeepneys")
        .json(&json!({ "plate_number": "ABC-1234", "capacity": 20 }))
        .await;
    assert_eq!(first.status_code(), 201);
    assert_eq!(first.json::<Value>()["plate_number"], "ABC 1234");

    for plate in ["ABC 1234", "abc1234"] {
        let response = server
            .post("/api/jeepneys")
            .json(&json!({ "plate_number": plate, "capacity": 20 }))
            .await;
        assert_eq!(response.status_code(), 409, "plate {}", plate);
    }
}

/// Test: status filter and update
#[tokio::test]
async fn test_list_by_status_and_update() {
    let server = create_test_server();

    for plate in ["AAA 111", "BBB 222", "CCC 333"] {
        server
            .post("/api/jeepneys")
            .json(&json!({ "plate_number": plate, "capacity": 20 }))
            .await;
    }

    let response = server
        .put("/api/jeepneys/2")
        .json(&json!({ "plate_number": "BBB 222", "capacity": 24, "active": false }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["capacity"], 24);

    let inactive: Value = server
        .get("/api/jeepneys")
        .add_query_param("status", "inactive")
        .await
        .json();
    assert_eq!(inactive["pagination"]["total"], 1);
    assert_eq!(inactive["data"][0]["plate_number"], "BBB 222");

    let active: Value = server
        .get("/api/jeepneys")
        .add_query_param("status", "active")
        .add_query_param("search", "aaa")
        .await
        .json();
    assert_eq!(active["pagination"]["total"], 1);
}

/// Test: unknown jeepneys are 404
#[tokio::test]
async fn test_unknown_jeepney_not_found() {
    let server = create_test_server();

    assert_eq!(server.get("/api/jeepneys/5").await.status_code(), 404);

    let response = server
        .put("/api/jeepneys/5")
        .json(&json!({ "plate_number": "ABC 123", "capacity": 20 }))
        .await;
    assert_eq!(response.status_code(), 404);
}
