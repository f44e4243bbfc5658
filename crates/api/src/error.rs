use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rebulk_core::error::CoreError;
use rebulk_engine::BulkActionError;
use serde_json::json;

/// Application-level error type for HTTP and WebSocket handlers.
///
/// Wraps [`CoreError`] for domain errors and adds transport-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses; the WebSocket gateway reuses [`AppError::parts`] for its
/// `exception` replies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `rebulk_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The target database or one of its nodes could not be used.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<BulkActionError> for AppError {
    fn from(err: BulkActionError) -> Self {
        match err {
            BulkActionError::Connection(_) | BulkActionError::Preparation(_) => {
                AppError::Unavailable(err.to_string())
            }
            other => AppError::Core(other.into()),
        }
    }
}

impl AppError {
    /// HTTP status, error code and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::InvalidState { .. } => {
                    (StatusCode::CONFLICT, "INVALID_STATE", core.to_string())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Transport-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                msg.clone(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
