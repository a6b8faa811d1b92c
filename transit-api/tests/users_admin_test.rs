//! Tests for the user administration endpoints

mod common;

use common::{create_synced_user, create_test_server};
use serde_json::{json, Value};

fn new_user(email: &str) -> Value {
    json!({
        "email": email,
        "name": "Maria Santos",
        "password": "Jeepney2024",
        "phone": "09171234567",
        "birthdate": "1990-05-17",
        "address": "Tejero, General Trias",
        "postal_code": "4107",
        "role": "driver",
    })
}

/// Test: an admin-created user is stored with a local subject id
#[tokio::test]
async fn test_create_user() {
    let server = create_test_server();

    let response = server.post("/api/users").json(&new_user("maria@example.ph")).await;

    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert!(body["auth0_id"].as_str().unwrap().starts_with("local|"));
    assert_eq!(body["role"], "driver");
    assert_eq!(body["birthdate"], "1990-05-17");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("password").is_none());
}

/// Test: email addresses are unique across users, ignoring case
#[tokio::test]
async fn test_duplicate_email_conflict() {
    let server = create_test_server();

    server.post("/api/users").json(&new_user("maria@example.ph")).await;
    let response = server.post("/api/users").json(&new_user("MARIA@example.ph")).await;

    assert_eq!(response.status_code(), 409);
}

/// Test: of two simultaneous creates with one email, exactly one succeeds
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_duplicate_email() {
    let server = create_test_server();

    let first_body = new_user("maria@example.ph");
    let second_body = new_user("Maria@example.ph");
    let (first, second) = tokio::join!(
        server.post("/api/users").json(&first_body),
        server.post("/api/users").json(&second_body),
    );

    let mut statuses = [first.status_code().as_u16(), second.status_code().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, [201, 409]);

    let list: Value = server.get("/api/users").await.json();
    assert_eq!(list["pagination"]["total"], 1);
}

/// Test: every invalid field is reported at once
#[tokio::test]
async fn test_create_reports_all_field_errors() {
    let server = create_test_server();

    let response = server
        .post("/api/users")
        .json(&json!({
            "email": "maria@",
            "name": "  ",
            "password": "short",
            "phone": "0917123456",
            "birthdate": "2001-02-29",
            "postal_code": "41070",
        }))
        .await;

    assert_eq!(response.status_code(), 422);
    let fields = &response.json::<Value>()["fields"];
    for field in ["email", "name", "password", "phone", "birthdate", "postal_code"] {
        assert!(fields[field].is_string(), "missing error for {}", field);
    }
}

/// Test: admin-created users must be adults
#[tokio::test]
async fn test_create_rejects_minor() {
    let server = create_test_server();

    let mut body = new_user("teen@example.ph");
    body["birthdate"] = json!("2020-01-01");
    let response = server.post("/api/users").json(&body).await;

    assert_eq!(response.status_code(), 422);
    assert!(response.json::<Value>()["fields"]["birthdate"].is_string());
}

/// Test: list supports search, filters and pagination
#[tokio::test]
async fn test_list_users_filters_and_paginates() {
    let server = create_test_server();

    for i in 0..12 {
        let role = if i % 3 == 0 { "driver" } else { "passenger" };
        create_synced_user(
            &server,
            &format!("auth0|{}", i),
            &format!("rider{}@example.ph", i),
            role,
        )
        .await;
    }

    let body: Value = server
        .get("/api/users")
        .add_query_param("page", 2)
        .add_query_param("limit", 5)
        .await
        .json();
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(body["pagination"]["page"], 2);
    assert_eq!(body["pagination"]["total"], 12);
    assert_eq!(body["pagination"]["total_pages"], 3);

    let drivers: Value = server
        .get("/api/users")
        .add_query_param("role", "driver")
        .await
        .json();
    assert_eq!(drivers["pagination"]["total"], 4);

    let search: Value = server
        .get("/api/users")
        .add_query_param("search", "RIDER11")
        .await
        .json();
    assert_eq!(search["pagination"]["total"], 1);
    assert_eq!(search["data"][0]["email"], "rider11@example.ph");
}

/// Test: out-of-range page sizes are clamped
#[tokio::test]
async fn test_limit_is_clamped() {
    let server = create_test_server();

    let body: Value = server
        .get("/api/users")
        .add_query_param("limit", 1000)
        .await
        .json();
    assert_eq!(body["pagination"]["limit"], 100);
    assert_eq!(body["pagination"]["total_pages"], 0);
}

/// Test: unknown filter values are validation errors
#[tokio::test]
async fn test_unknown_status_filter_rejected() {
    let server = create_test_server();

    let response = server
        .get("/api/users")
        .add_query_param("status", "banned")
        .await;
    assert_eq!(response.status_code(), 422);
}

/// Test: profile update changes only the fields sent
#[tokio::test]
async fn test_update_user_profile() {
    let server = create_test_server();

    let created: Value = server
        .post("/api/users")
        .json(&new_user("maria@example.ph"))
        .await
        .json();
    let id = created["id"].as_u64().unwrap();

    let response = server
        .put(&format!("/api/users/{}", id))
        .json(&json!({ "phone": "09998887777", "role": "passenger" }))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["phone"], "09998887777");
    assert_eq!(body["role"], "passenger");
    assert_eq!(body["name"], "Maria Santos");
    assert_eq!(body["postal_code"], "4107");
}

/// Test: bad values in an update are rejected
#[tokio::test]
async fn test_update_rejects_bad_phone() {
    let server = create_test_server();

    let created: Value = server
        .post("/api/users")
        .json(&new_user("maria@example.ph"))
        .await
        .json();

    let response = server
        .put(&format!("/api/users/{}", created["id"]))
        .json(&json!({ "phone": "08171234567" }))
        .await;
    assert_eq!(response.status_code(), 422);
}

/// Test: unknown users are 404
#[tokio::test]
async fn test_unknown_user_not_found() {
    let server = create_test_server();

    let response = server.get("/api/users/999").await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["error"], "User not found");

    let response = server
        .post("/api/users/999/verification")
        .json(&json!({ "status": "verified" }))
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: verification accepts only verified or rejected
#[tokio::test]
async fn test_verification_status_values() {
    let server = create_test_server();
    let id = create_synced_user(&server, "auth0|1", "a@example.ph", "passenger").await;

    let response = server
        .post(&format!("/api/users/{}/verification", id))
        .json(&json!({ "status": "pending" }))
        .await;
    assert_eq!(response.status_code(), 422);

    let response = server
        .post(&format!("/api/users/{}/verification", id))
        .json(&json!({ "status": "rejected" }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["verification"], "rejected");
}

/// Test: a discount application moves from pending to approved
#[tokio::test]
async fn test_discount_application_review() {
    let server = create_test_server();
    let id = create_synced_user(&server, "auth0|1", "a@example.ph", "passenger").await;

    let response = server
        .post(&format!("/api/users/{}/discount", id))
        .json(&json!({ "category": "Senior", "document": "uploads/senior-id.jpg" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["category"], "senior");
    assert_eq!(body["status"], "pending");

    let response = server
        .post(&format!("/api/users/{}/discount/review", id))
        .json(&json!({ "approve": true }))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["status"], "approved");

    let user: Value = server.get(&format!("/api/users/{}", id)).await.json();
    assert_eq!(user["discount"]["status"], "approved");
}

/// Test: unknown categories and blank documents are rejected
#[tokio::test]
async fn test_discount_application_validation() {
    let server = create_test_server();
    let id = create_synced_user(&server, "auth0|1", "a@example.ph", "passenger").await;

    let response = server
        .post(&format!("/api/users/{}/discount", id))
        .json(&json!({ "category": "veteran", "document": "" }))
        .await;

    assert_eq!(response.status_code(), 422);
    let fields = &response.json::<Value>()["fields"];
    assert!(fields["category"].is_string());
    assert!(fields["document"].is_string());
}

/// Test: reviewing without an application is 404
#[tokio::test]
async fn test_review_without_application_not_found() {
    let server = create_test_server();
    let id = create_synced_user(&server, "auth0|1", "a@example.ph", "passenger").await;

    let response = server
        .post(&format!("/api/users/{}/discount/review", id))
        .json(&json!({ "approve": false }))
        .await;

    assert_eq!(response.status_code(), 404);
    assert_eq!(
        response.json::<Value>()["error"],
        "Discount application not found"
    );
}
