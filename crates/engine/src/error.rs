use std::time::Duration;

use rebulk_core::error::CoreError;
use rebulk_core::status::BulkActionStatus;

/// Errors raised while preparing or running a bulk action.
#[derive(Debug, thiserror::Error)]
pub enum BulkActionError {
    /// `prepare()` or `start()` called from the wrong status.
    #[error("Bulk action is {actual}, expected {expected}")]
    InvalidState {
        expected: BulkActionStatus,
        actual: BulkActionStatus,
    },

    /// A node worker's pre-flight step failed.
    #[error("Preparation failed: {0}")]
    Preparation(String),

    /// A node worker failed while executing.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Could not reach the database or one of its nodes.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Report generation was requested but no stream attached in time.
    #[error("Report stream was not attached within {} ms", .0.as_millis())]
    StreamTimeout(Duration),

    /// The report rendezvous was abandoned because the action was aborted.
    #[error("Report stream wait was aborted")]
    StreamAborted,
}

impl From<BulkActionError> for CoreError {
    fn from(err: BulkActionError) -> Self {
        match err {
            BulkActionError::InvalidState { expected, actual } => {
                CoreError::InvalidState { expected, actual }
            }
            other => CoreError::Internal(other.to_string()),
        }
    }
}
