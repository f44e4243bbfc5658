//! rebulk API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! WebSocket gateway, bulk actions registry) so integration tests and the
//! binary entrypoint can both access them.

pub mod bulk_actions;
pub mod config;
pub mod error;
pub mod handlers;
pub mod notifications;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
