//! Redis side of bulk actions.
//!
//! [`RedisDatabase`] discovers the primary nodes of a standalone server or
//! a cluster, and [`RedisWorkerFactory`] builds the per-node workers:
//! [`DeleteWorker`] scans and deletes keys matching a filter,
//! [`UploadWorker`] executes raw commands routed to its node.

pub mod client;
pub mod delete_worker;
pub mod error;
pub mod factory;
pub mod slots;
pub mod topology;
pub mod upload_worker;

pub use client::RedisDatabase;
pub use delete_worker::DeleteWorker;
pub use error::RedisWorkerError;
pub use factory::RedisWorkerFactory;
pub use upload_worker::UploadWorker;
