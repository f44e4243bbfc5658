//! Event-bus-to-WebSocket routing of overview notifications.
//!
//! [`OverviewRelay`] subscribes to the event bus and pushes each
//! `overview` event to the room of its bulk action. Delivery is best
//! effort: a room with no members is logged and skipped.

use std::sync::Arc;

use rebulk_core::bulk_events::EVENT_OVERVIEW;
use rebulk_events::BulkActionEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::messages::WsReply;
use crate::ws::WsManager;

/// Routes overview events to the connections following each action.
pub struct OverviewRelay {
    ws_manager: Arc<WsManager>,
}

impl OverviewRelay {
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the routing loop until the bus closes or `cancel` fires.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<BulkActionEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                received = receiver.recv() => received,
                _ = cancel.cancelled() => {
                    tracing::info!("Overview relay cancelled");
                    break;
                }
            };

            match received {
                Ok(event) => self.route_event(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Overview relay lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, overview relay shutting down");
                    break;
                }
            }
        }
    }

    async fn route_event(&self, event: BulkActionEvent) {
        if event.event != EVENT_OVERVIEW {
            return;
        }

        let message = WsReply::new(EVENT_OVERVIEW, &event.payload).into_message();
        let delivered = self
            .ws_manager
            .send_to_room(&event.bulk_action_id, message)
            .await;

        if delivered == 0 {
            tracing::debug!(
                bulk_action_id = %event.bulk_action_id,
                "No subscribers for overview",
            );
        } else {
            tracing::trace!(
                bulk_action_id = %event.bulk_action_id,
                delivered,
                "Overview delivered",
            );
        }
    }
}
