//! Request handlers for the REST surface.
//!
//! Handlers resolve bulk actions through the registry in [`AppState`] and
//! map errors via [`AppError`](crate::error::AppError).
//!
//! [`AppState`]: crate::state::AppState

pub mod bulk_actions;
