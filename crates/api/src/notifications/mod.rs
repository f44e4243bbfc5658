//! Delivery of bulk action events to WebSocket clients.

pub mod relay;

pub use relay::OverviewRelay;
