//! Tests for CORS preflight handling and unmatched routes

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{create_test_app, create_test_server};
use serde_json::Value;
use tower::ServiceExt;

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Test: a browser preflight gets 200 with CORS headers and no body
#[tokio::test]
async fn test_preflight_allowed() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/auth0/sync-user")
                .header("origin", "https://admin.example.ph")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "authorization,x-auth0-action")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "*"
    );
    let allow_methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(allow_methods.contains("POST"));
    assert!(body_bytes(response).await.is_empty());
}

/// Test: a bare OPTIONS on the sync endpoint is 200 with an empty body
#[tokio::test]
async fn test_plain_options_on_sync_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/api/auth0/sync-user")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());
}

/// Test: unknown paths return the JSON not-found body
#[tokio::test]
async fn test_unknown_path_not_found() {
    let server = create_test_server();

    let response = server.get("/api/trips").await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["error"], "Route not found");
}

/// Test: unsupported methods on known paths are treated as unknown routes
#[tokio::test]
async fn test_unmatched_method_not_found() {
    let server = create_test_server();

    let response = server.get("/api/auth0/sync-user").await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["error"], "Route not found");

    let response = server.delete("/api/users/1").await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["error"], "Route not found");
}

/// Test: responses to real requests carry the allow-origin header
#[tokio::test]
async fn test_simple_request_gets_cors_header() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/routes")
                .header("origin", "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
