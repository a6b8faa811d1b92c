//! Common test utilities for backend integration tests

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use transit_api::{routes, AppState, InMemoryTransitStore, InMemoryUserStore};

/// Token the test server expects from the Auth0 action
pub const TEST_TOKEN: &str = "test-backend-token";

/// Build the router over fresh in-memory stores
pub fn create_test_app() -> Router {
    let state = Arc::new(AppState::new(
        TEST_TOKEN,
        InMemoryUserStore::new(),
        InMemoryTransitStore::new(),
    ));
    routes::create_router(state)
}

/// Create a test server over fresh in-memory stores
pub fn create_test_server() -> TestServer {
    TestServer::new(create_test_app()).expect("Failed to create test server")
}

/// POST a user to the sync endpoint the way the Auth0 action does
pub async fn sync_user(server: &TestServer, body: &Value) -> TestResponse {
    server
        .post("/api/auth0/sync-user")
        .add_header(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Bearer {}", TEST_TOKEN)).unwrap(),
        )
        .add_header(
            HeaderName::from_static("x-auth0-action"),
            HeaderValue::from_static("post-user-registration"),
        )
        .json(body)
        .await
}

/// Sync a user with the given role and return the local user id
pub async fn create_synced_user(
    server: &TestServer,
    auth0_id: &str,
    email: &str,
    role: &str,
) -> u64 {
    let response = sync_user(
        server,
        &json!({
            "user_id": auth0_id,
            "email": email,
            "name": "Test User",
            "email_verified": true,
            "app_metadata": { "role": role },
        }),
    )
    .await;
    assert_eq!(response.status_code(), 200);
    response.json::<Value>()["user_id"].as_u64().unwrap()
}

/// Create a route with checkpoints in the given order and return its id
pub async fn create_route(server: &TestServer, name: &str, checkpoints: &[&str]) -> u64 {
    let response = server.post("/api/routes").json(&json!({ "name": name })).await;
    assert_eq!(response.status_code(), 201);
    let route_id = response.json::<Value>()["id"].as_u64().unwrap();

    for checkpoint in checkpoints {
        let response = server
            .post(&format!("/api/routes/{}/checkpoints", route_id))
            .json(&json!({ "name": checkpoint }))
            .await;
        assert_eq!(response.status_code(), 201);
    }

    route_id
}

/// Add a fare entry and return its id
pub async fn create_fare(
    server: &TestServer,
    route_id: u64,
    from: &str,
    to: &str,
    fare: f64,
) -> u64 {
    let response = server
        .post("/api/fares")
        .json(&json!({
            "route_id": route_id,
            "from": from,
            "to": to,
            "fare": fare,
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    response.json::<Value>()["id"].as_u64().unwrap()
}

/// The Tejero - Pala-pala route with its sample fare matrix
///
/// The matrix includes a duplicate Robinson Tejero -> Malabon entry priced
/// 14 after the first entry at 12.
pub async fn create_sample_route(server: &TestServer) -> u64 {
    let route_id = create_route(
        server,
        "Tejero - Pala-pala",
        &[
            "Tejero Terminal",
            "Robinson Tejero",
            "Malabon",
            "Bayan Luma",
            "Anabu",
            "Pala-pala Terminal",
        ],
    )
    .await;

    for (from, to, fare) in [
        ("Tejero Terminal", "Robinson Tejero", 12.0),
        ("Robinson Tejero", "Malabon", 12.0),
        ("Tejero Terminal", "Malabon", 13.0),
        ("Malabon", "Bayan Luma", 13.0),
        ("Bayan Luma", "Anabu", 14.0),
        ("Anabu", "Pala-pala Terminal", 15.0),
        ("Robinson Tejero", "Pala-pala Terminal", 25.0),
        ("Robinson Tejero", "Malabon", 14.0),
    ] {
        create_fare(server, route_id, from, to, fare).await;
    }

    route_id
}
