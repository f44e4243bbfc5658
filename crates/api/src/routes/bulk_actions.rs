//! Route definitions for bulk actions of a database.
//!
//! Mounted at `/databases/{database_id}/bulk-actions`.
//!
//! ```text
//! GET    /{id}                    get_bulk_action
//! DELETE /{id}                    abort_bulk_action
//! GET    /{id}/report/download    download_report
//! ```

use axum::routing::get;
use axum::Router;

use crate::handlers::bulk_actions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(bulk_actions::get_bulk_action).delete(bulk_actions::abort_bulk_action),
        )
        .route("/{id}/report/download", get(bulk_actions::download_report))
}
