use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use rebulk_core::types::Timestamp;
use tokio::sync::{mpsc, RwLock};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Rooms this connection has joined, one per followed bulk action.
    pub rooms: HashSet<String>,
}

#[derive(Default)]
struct Registry {
    connections: HashMap<String, WsConnection>,
    rooms: HashMap<String, HashSet<String>>,
}

impl Registry {
    fn leave_all(&mut self, conn_id: &str, rooms: &HashSet<String>) {
        for room in rooms {
            if let Some(members) = self.rooms.get_mut(room) {
                members.remove(conn_id);
                if members.is_empty() {
                    self.rooms.remove(room);
                }
            }
        }
    }
}

/// Manages all active WebSocket connections and their room memberships.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    inner: RwLock<Registry>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Registry::default()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
            rooms: HashSet::new(),
        };
        self.inner.write().await.connections.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID, leaving every room it joined.
    pub async fn remove(&self, conn_id: &str) {
        let mut inner = self.inner.write().await;
        if let Some(conn) = inner.connections.remove(conn_id) {
            inner.leave_all(conn_id, &conn.rooms);
        }
    }

    /// Add a connection to a room. Unknown connections are ignored.
    pub async fn join(&self, conn_id: &str, room: &str) {
        let mut inner = self.inner.write().await;
        let Some(conn) = inner.connections.get_mut(conn_id) else {
            return;
        };
        conn.rooms.insert(room.to_string());
        inner
            .rooms
            .entry(room.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    pub async fn leave(&self, conn_id: &str, room: &str) {
        let mut inner = self.inner.write().await;
        if let Some(conn) = inner.connections.get_mut(conn_id) {
            conn.rooms.remove(room);
        }
        inner.leave_all(conn_id, &HashSet::from([room.to_string()]));
    }

    /// Send a message to a single connection.
    ///
    /// Returns `false` if the connection is unknown or its channel closed.
    pub async fn send_to(&self, conn_id: &str, message: Message) -> bool {
        let inner = self.inner.read().await;
        inner
            .connections
            .get(conn_id)
            .is_some_and(|conn| conn.sender.send(message).is_ok())
    }

    /// Send a message to every connection in a room.
    ///
    /// Returns the number of connections the message was delivered to.
    pub async fn send_to_room(&self, room: &str, message: Message) -> usize {
        let inner = self.inner.read().await;
        let Some(members) = inner.rooms.get(room) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|id| inner.connections.get(id))
            .filter(|conn| conn.sender.send(message.clone()).is_ok())
            .count()
    }

    pub async fn room_size(&self, room: &str) -> usize {
        self.inner
            .read()
            .await
            .rooms
            .get(room)
            .map_or(0, HashSet::len)
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Send a Close frame to every connection, then clear the registry.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut inner = self.inner.write().await;
        let count = inner.connections.len();
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        inner.connections.clear();
        inner.rooms.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let inner = self.inner.read().await;
        for conn in inner.connections.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
