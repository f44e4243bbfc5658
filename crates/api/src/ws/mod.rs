//! WebSocket gateway for bulk actions.
//!
//! Provides connection and room management, heartbeat monitoring, the
//! frame envelope, and the HTTP upgrade handler used by Axum routes.

mod handler;
mod heartbeat;
pub mod manager;
pub mod messages;

pub use handler::{handle_message, ws_handler};
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
