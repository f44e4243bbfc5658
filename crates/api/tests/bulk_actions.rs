//! Integration tests for the bulk actions gateway, REST endpoints and
//! report download.

mod common;

use std::time::Duration;

use axum::extract::ws::Message;
use axum::http::{header, Method, StatusCode};
use common::{body_json, body_text, build_test_app, get, send, FakeBackend, TEST_DB};
use rebulk_api::notifications::OverviewRelay;
use rebulk_api::state::AppState;
use rebulk_api::ws::handle_message;
use rebulk_core::report::REPORT_UNAVAILABLE_MESSAGE;
use rebulk_core::status::BulkActionStatus;
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn create_frame(id: &str, database_id: &str, generate_report: bool) -> String {
    json!({
        "event": "create",
        "data": {
            "id": id,
            "databaseId": database_id,
            "type": "delete",
            "filter": {"type": null, "match": "key:*"},
            "generateReport": generate_report,
        }
    })
    .to_string()
}

async fn wait_until_terminal(state: &AppState, id: &str) -> BulkActionStatus {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = state.bulk_actions.get(id).await.unwrap().status();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bulk action did not finish")
}

/// Dispatch a gateway frame and return the reply as JSON.
async fn frame(state: &AppState, conn_id: &str, text: &str) -> serde_json::Value {
    serde_json::to_value(handle_message(state, conn_id, text).await).unwrap()
}

// ---------------------------------------------------------------------------
// Test: create over the gateway replies with the overview and runs the job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_replies_with_overview_and_completes() {
    let app = build_test_app(FakeBackend::new(3, Duration::from_millis(1)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;

    let reply = frame(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;

    assert_eq!(reply["event"], "create");
    assert_eq!(reply["data"]["id"], "job-1");
    assert_eq!(reply["data"]["databaseId"], TEST_DB);
    assert_eq!(reply["data"]["type"], "delete");
    assert_eq!(reply["data"]["filter"]["match"], "key:*");
    assert!(reply["data"].get("downloadUrl").is_none());
    assert_eq!(app.state.ws_manager.room_size("job-1").await, 1);

    assert_eq!(
        wait_until_terminal(&app.state, "job-1").await,
        BulkActionStatus::Completed
    );
    let overview = app.state.bulk_actions.overview("job-1").await.unwrap();
    assert_eq!(overview.summary.processed, 3);
    assert_eq!(overview.summary.succeed, 3);
}

// ---------------------------------------------------------------------------
// Test: duplicate id is rejected with a CONFLICT exception
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let app = build_test_app(FakeBackend::new(100, Duration::from_millis(10)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;

    handle_message(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;
    let reply = frame(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;

    assert_eq!(reply["event"], "exception");
    assert_eq!(reply["data"]["code"], "CONFLICT");
    assert_eq!(app.state.bulk_actions.len().await, 1);
}

// ---------------------------------------------------------------------------
// Test: unknown database and bad frames become exceptions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_requests_become_exceptions() {
    let app = build_test_app(FakeBackend::new(1, Duration::ZERO));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;

    let unknown_db = frame(&app.state, "conn-1", &create_frame("job-1", "nope", false)).await;
    assert_eq!(unknown_db["event"], "exception");
    assert_eq!(unknown_db["data"]["code"], "NOT_FOUND");
    assert_eq!(app.state.ws_manager.room_size("job-1").await, 0);
    assert!(app.state.bulk_actions.is_empty().await);

    let unknown_event = frame(&app.state, "conn-1", r#"{"event":"pause","data":{}}"#).await;
    assert_eq!(unknown_event["data"]["code"], "BAD_REQUEST");

    let garbage = frame(&app.state, "conn-1", "not json").await;
    assert_eq!(garbage["event"], "exception");

    let missing = frame(&app.state, "conn-1", r#"{"event":"get","data":{"id":"ghost"}}"#).await;
    assert_eq!(missing["data"]["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: overview pushes reach the creating connection's room
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overview_pushes_reach_the_room() {
    let app = build_test_app(FakeBackend::new(2, Duration::from_millis(1)));
    let mut rx = app.state.ws_manager.add("conn-1".into()).await;

    let cancel = CancellationToken::new();
    let relay = tokio::spawn(
        OverviewRelay::new(app.state.ws_manager.clone())
            .run(app.state.event_bus.subscribe(), cancel.clone()),
    );

    handle_message(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;

    let last = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let Message::Text(text) = rx.recv().await.expect("connection dropped") else {
                continue;
            };
            let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
            assert_eq!(json["event"], "overview");
            if json["data"]["status"] == "completed" {
                return json;
            }
        }
    })
    .await
    .expect("no terminal overview pushed");

    assert_eq!(last["data"]["summary"]["processed"], 2);

    cancel.cancel();
    relay.await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: a disconnecting owner aborts its actions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn abort_owned_by_stops_the_owners_actions() {
    let app = build_test_app(FakeBackend::new(1000, Duration::from_millis(10)));
    let _rx1 = app.state.ws_manager.add("conn-1".into()).await;
    let _rx2 = app.state.ws_manager.add("conn-2".into()).await;

    handle_message(&app.state, "conn-1", &create_frame("mine", TEST_DB, false)).await;
    handle_message(&app.state, "conn-2", &create_frame("theirs", TEST_DB, false)).await;
    let mine = app.state.bulk_actions.get("mine").await.unwrap();

    assert_eq!(app.state.bulk_actions.abort_owned_by("conn-1").await, 1);

    assert_eq!(mine.status(), BulkActionStatus::Aborted);
    assert!(app.state.bulk_actions.get("mine").await.is_err());
    assert!(app.state.bulk_actions.get("theirs").await.is_ok());
}

// ---------------------------------------------------------------------------
// Test: GET returns the overview in a data envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rest_get_returns_overview() {
    let app = build_test_app(FakeBackend::new(100, Duration::from_millis(10)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;
    handle_message(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;

    let response = get(app.router.clone(), "/api/v1/databases/db-1/bulk-actions/job-1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], "job-1");
    assert!(json["data"]["progress"]["total"].is_number());

    let wrong_db = get(app.router.clone(), "/api/v1/databases/other/bulk-actions/job-1").await;
    assert_eq!(wrong_db.status(), StatusCode::NOT_FOUND);

    let missing = get(app.router, "/api/v1/databases/db-1/bulk-actions/ghost").await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let json = body_json(missing).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Test: DELETE aborts and unregisters the action
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rest_delete_aborts() {
    let app = build_test_app(FakeBackend::new(1000, Duration::from_millis(10)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;
    handle_message(&app.state, "conn-1", &create_frame("job-1", TEST_DB, false)).await;

    let uri = "/api/v1/databases/db-1/bulk-actions/job-1";
    let response = send(app.router.clone(), Method::DELETE, uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "aborted");

    let gone = get(app.router, uri).await;
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: report download streams header, key lines and footer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_download_streams_the_report() {
    let app = build_test_app(FakeBackend::new(2, Duration::from_millis(1)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;

    let reply = frame(&app.state, "conn-1", &create_frame("job-1", TEST_DB, true)).await;
    assert_eq!(
        reply["data"]["downloadUrl"],
        "databases/db-1/bulk-actions/job-1/report/download"
    );

    let response = get(
        app.router,
        "/api/v1/databases/db-1/bulk-actions/job-1/report/download",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"bulk-delete-report-job-1.txt\""
    );
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let text = body_text(response).await;
    assert!(text.starts_with("Bulk Delete Report\n"));
    assert!(text.contains("key:0 - OK\nkey:1 - OK\n"));
    assert!(text.contains("Status: completed"));
    assert!(text.contains("Processed: 2 keys"));
}

// ---------------------------------------------------------------------------
// Test: report download for an unknown action gets the fallback message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn report_download_for_unknown_action_falls_back() {
    let app = build_test_app(FakeBackend::new(1, Duration::ZERO));

    let response = get(
        app.router,
        "/api/v1/databases/db-1/bulk-actions/ghost/report/download",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, REPORT_UNAVAILABLE_MESSAGE);
}

// ---------------------------------------------------------------------------
// Test: a second download of the same report gets the fallback message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_report_download_falls_back() {
    let app = build_test_app(FakeBackend::new(50, Duration::from_millis(5)));
    let _rx = app.state.ws_manager.add("conn-1".into()).await;
    handle_message(&app.state, "conn-1", &create_frame("job-1", TEST_DB, true)).await;

    let uri = "/api/v1/databases/db-1/bulk-actions/job-1/report/download";
    let first = get(app.router.clone(), uri).await;
    let second = get(app.router, uri).await;

    assert_eq!(body_text(second).await, REPORT_UNAVAILABLE_MESSAGE);
    assert!(body_text(first).await.contains("Status: completed"));
}
