//! Registry of live bulk actions and the plumbing that creates them.

pub mod backend;
pub mod dto;
mod provider;

pub use backend::{BulkActionBackend, RedisBackend, WorkerPlan};
pub use dto::{BulkActionIdDto, BulkActionRequest, CreateBulkActionDto};
pub use provider::BulkActionsProvider;
