pub mod bulk_actions;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bulk-actions/ws                                           WebSocket gateway
///
/// /databases/{database_id}/bulk-actions/{id}                 get, abort
/// /databases/{database_id}/bulk-actions/{id}/report/download report stream
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/bulk-actions/ws", get(ws::ws_handler))
        .nest(
            "/databases/{database_id}/bulk-actions",
            bulk_actions::router(),
        )
}
