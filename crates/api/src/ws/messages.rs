//! Envelope of every WebSocket frame exchanged with clients.

use axum::extract::ws::Message;
use rebulk_core::bulk_events::EVENT_EXCEPTION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound `{ "event": ..., "data": ... }` frame.
#[derive(Debug, Clone, Deserialize)]
pub struct WsRequest {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Outbound `{ "event": ..., "data": ... }` frame.
#[derive(Debug, Clone, Serialize)]
pub struct WsReply {
    pub event: String,
    pub data: Value,
}

impl WsReply {
    pub fn new(event: impl Into<String>, data: impl Serialize) -> Self {
        Self {
            event: event.into(),
            data: serde_json::to_value(data).unwrap_or(Value::Null),
        }
    }

    pub fn exception(code: &str, error: impl Into<String>) -> Self {
        Self {
            event: EVENT_EXCEPTION.to_string(),
            data: serde_json::json!({ "code": code, "error": error.into() }),
        }
    }

    pub fn into_message(self) -> Message {
        let text = serde_json::to_string(&self).unwrap_or_default();
        Message::Text(text.into())
    }
}
