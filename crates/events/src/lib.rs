//! rebulk event bus and notification debouncing.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`. The engine publishes here; transport
//!   adapters subscribe.
//! - [`BulkActionEvent`]: the event envelope carried on the bus.
//! - [`Debouncer`]: coalesces repeated notification requests into at
//!   most one emission per window, with an explicit synchronous flush.

pub mod bus;
pub mod debounce;

pub use bus::{BulkActionEvent, EventBus};
pub use debounce::Debouncer;
