//! Domain model for rebulk bulk actions.
//!
//! Everything in this crate is pure: no async, no I/O. The engine,
//! Redis and API crates build on these types.
//!
//! - [`status`]: the closed status enum and its transition function.
//! - [`filter`]: immutable key selection criteria.
//! - [`progress`]: progress and summary snapshots plus aggregation.
//! - [`overview`]: the externally visible read model of a job.
//! - [`report`]: the text format of downloadable reports.
//! - [`commands`]: tokenizer for raw Redis command uploads.

pub mod bulk_events;
pub mod commands;
pub mod error;
pub mod filter;
pub mod overview;
pub mod progress;
pub mod report;
pub mod status;
pub mod types;
