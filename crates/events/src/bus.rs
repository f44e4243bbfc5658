//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the boundary between the bulk action engine and the
//! transports that deliver notifications to clients. The engine only
//! publishes; it never learns whether anyone received the event.

use chrono::{DateTime, Utc};
use rebulk_core::bulk_events::EVENT_OVERVIEW;
use rebulk_core::overview::BulkActionOverview;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BulkActionEvent
// ---------------------------------------------------------------------------

/// An event concerning a single bulk action.
///
/// Constructed via [`BulkActionEvent::new`] or the
/// [`overview`](BulkActionEvent::overview) shortcut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkActionEvent {
    /// Event name as seen by clients, e.g. `"overview"`.
    pub event: String,

    /// Id of the bulk action the event is about. Transports use it to
    /// pick the room of interested connections.
    pub bulk_action_id: String,

    /// Database the bulk action runs against.
    pub database_id: String,

    /// JSON payload delivered to clients as-is.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl BulkActionEvent {
    /// Create an event with an empty object payload.
    pub fn new(
        event: impl Into<String>,
        bulk_action_id: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            bulk_action_id: bulk_action_id.into(),
            database_id: database_id.into(),
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload for the event.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// An `overview` event carrying the serialized overview.
    pub fn overview(overview: &BulkActionOverview) -> Self {
        let payload = serde_json::to_value(overview).unwrap_or_else(|e| {
            tracing::error!(error = %e, bulk_action_id = %overview.id, "Failed to serialize overview");
            serde_json::Value::Null
        });
        Self::new(EVENT_OVERVIEW, overview.id.clone(), overview.database_id.clone())
            .with_payload(payload)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`BulkActionEvent`].
///
/// # Usage
///
/// ```rust
/// use rebulk_events::bus::{BulkActionEvent, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(BulkActionEvent::new("overview", "job-1", "db-1"));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<BulkActionEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: BulkActionEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<BulkActionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
