//! Push-channel event names for bulk actions.
//!
//! Shared by the engine (which publishes overviews) and the API gateway
//! (which relays them to WebSocket rooms and answers client requests).

/// A fresh overview of a bulk action.
pub const EVENT_OVERVIEW: &str = "overview";

/// Client request: create and start a bulk action.
pub const EVENT_CREATE: &str = "create";

/// Client request: fetch the current overview of a bulk action.
pub const EVENT_GET: &str = "get";

/// Client request: abort a running bulk action.
pub const EVENT_ABORT: &str = "abort";

/// Reply sent when a client request could not be served.
pub const EVENT_EXCEPTION: &str = "exception";
