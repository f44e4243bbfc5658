use std::sync::Arc;

use crate::bulk_actions::BulkActionsProvider;
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Event bus the bulk actions publish their overviews on.
    pub event_bus: Arc<rebulk_events::EventBus>,
    /// Registry of live bulk actions.
    pub bulk_actions: Arc<BulkActionsProvider>,
}
