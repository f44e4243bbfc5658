//! Handlers for the `/databases/{database_id}/bulk-actions` resource.
//!
//! The WebSocket gateway is the primary surface; these endpoints expose
//! read and abort for plain HTTP clients, plus the report download that
//! feeds a running action's report stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use rebulk_core::error::CoreError;
use rebulk_core::overview::BulkActionOverview;
use rebulk_core::report::REPORT_UNAVAILABLE_MESSAGE;
use rebulk_engine::{BulkAction, ChannelReportSink, ReportSink};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Look up an action and check that it belongs to `database_id`.
async fn find(
    state: &AppState,
    database_id: &str,
    id: &str,
) -> Result<Arc<BulkAction>, CoreError> {
    let action = state.bulk_actions.get(id).await?;
    if action.database_id() != database_id {
        return Err(CoreError::NotFound {
            entity: "BulkAction",
            id: id.to_string(),
        });
    }
    Ok(action)
}

/// `Content-Disposition` value of a report download.
pub fn report_disposition(id: &str) -> String {
    format!("attachment; filename=\"bulk-delete-report-{id}.txt\"")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/databases/{database_id}/bulk-actions/{id}
pub async fn get_bulk_action(
    State(state): State<AppState>,
    Path((database_id, id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<BulkActionOverview>>> {
    let action = find(&state, &database_id, &id).await?;
    Ok(Json(DataResponse {
        data: action.overview(),
    }))
}

/// DELETE /api/v1/databases/{database_id}/bulk-actions/{id}
///
/// Aborts the action and removes it from the registry.
pub async fn abort_bulk_action(
    State(state): State<AppState>,
    Path((database_id, id)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<BulkActionOverview>>> {
    find(&state, &database_id, &id).await?;
    let overview = state.bulk_actions.abort(&id).await?;
    Ok(Json(DataResponse { data: overview }))
}

/// GET /api/v1/databases/{database_id}/bulk-actions/{id}/report/download
///
/// Streams the report as it is produced. An action that is unknown or no
/// longer waiting for its report gets the "try again" message instead.
pub async fn download_report(
    State(state): State<AppState>,
    Path((database_id, id)): Path<(String, String)>,
) -> AppResult<Response> {
    let (mut sink, receiver) = ChannelReportSink::new();

    match find(&state, &database_id, &id).await {
        Ok(action) => {
            tracing::debug!(bulk_action_id = %id, "Report download attached");
            action.set_streaming_response(Box::new(sink));
        }
        Err(e) => {
            tracing::debug!(
                bulk_action_id = %id,
                error = %e,
                "Report requested for unknown action",
            );
            if let Err(e) = sink.write(REPORT_UNAVAILABLE_MESSAGE) {
                tracing::debug!(error = %e, "Failed to write report fallback message");
            }
            sink.close();
        }
    }

    let stream = UnboundedReceiverStream::new(receiver).map(Ok::<_, Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_DISPOSITION, report_disposition(&id))
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
