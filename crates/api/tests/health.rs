//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, build_test_app, get, FakeBackend};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = build_test_app(FakeBackend::new(0, Duration::ZERO));
    let response = get(app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(FakeBackend::new(0, Duration::ZERO));
    let response = get(app.router, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app(FakeBackend::new(0, Duration::ZERO));
    let response = get(app.router, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");

    // A generated UUID: 36 chars with hyphens.
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

// ---------------------------------------------------------------------------
// Test: WebSocket endpoint rejects plain GET requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ws_endpoint_requires_upgrade() {
    let app = build_test_app(FakeBackend::new(0, Duration::ZERO));
    let response = get(app.router, "/api/v1/bulk-actions/ws").await;

    assert!(response.status().is_client_error());
}

// ---------------------------------------------------------------------------
// Test: CORS exposes Content-Disposition to allowed origins
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_exposes_content_disposition_to_allowed_origin() {
    let app = build_test_app(FakeBackend::new(0, Duration::ZERO));
    let request = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();

    let response = app.router.oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(
        headers.get("access-control-allow-origin").unwrap(),
        "http://localhost:5173"
    );
    let exposed = headers
        .get("access-control-expose-headers")
        .expect("Content-Disposition must be exposed")
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("content-disposition"));
}
