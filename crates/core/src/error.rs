use crate::status::BulkActionStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An operation was requested while the bulk action was in a status
    /// that does not allow it.
    #[error("Invalid state: expected {expected}, found {actual}")]
    InvalidState {
        expected: BulkActionStatus,
        actual: BulkActionStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
