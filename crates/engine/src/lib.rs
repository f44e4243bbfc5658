//! Bulk action coordination engine.
//!
//! [`BulkAction`] runs one operation against every primary node of a
//! database: it creates one [`NodeWorker`] per node, drives their
//! preparation and concurrent execution, aggregates their counters into
//! overviews, debounces overview notifications onto the event bus, and
//! optionally streams a text report to a late-attaching sink.

pub mod analytics;
pub mod bulk_action;
pub mod counters;
pub mod error;
pub mod report;
pub mod settings;
pub mod worker;

pub use analytics::{BulkActionAnalytics, TracingAnalytics};
pub use bulk_action::{BulkAction, BulkActionParams};
pub use counters::{WorkerProgress, WorkerSummary};
pub use error::BulkActionError;
pub use report::{ChannelReportSink, ReportSink, ReportStreamer};
pub use settings::BulkActionSettings;
pub use worker::{ActionHandle, ConnectionHandle, NodeWorker, NodeWorkerFactory, PrimaryNode};
