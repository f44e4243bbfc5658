use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use rebulk_core::bulk_events::{EVENT_ABORT, EVENT_CREATE, EVENT_GET};
use serde::de::DeserializeOwned;

use crate::bulk_actions::{BulkActionIdDto, CreateBulkActionDto};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::ws::messages::{WsReply, WsRequest};

/// HTTP handler that upgrades the connection to WebSocket.
///
/// After the upgrade the connection is registered with `WsManager` and
/// managed by two tasks (sender + receiver).
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Spawns a sender task that forwards messages from the manager channel.
///   3. Dispatches inbound frames on the current task.
///   4. On disconnect, aborts the bulk actions this connection created.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone()).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let reply = handle_message(&state, &conn_id, text.as_str()).await;
                state
                    .ws_manager
                    .send_to(&conn_id, reply.into_message())
                    .await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    let aborted = state.bulk_actions.abort_owned_by(&conn_id).await;
    state.ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, aborted, "WebSocket disconnected");
}

/// Dispatch one inbound text frame and build the reply for its sender.
///
/// `create` and `get` join the connection to the room of the bulk action,
/// so it receives the `overview` pushes that follow.
pub async fn handle_message(state: &AppState, conn_id: &str, text: &str) -> WsReply {
    let request: WsRequest = match serde_json::from_str(text) {
        Ok(request) => request,
        Err(e) => return exception(&AppError::BadRequest(format!("Malformed frame: {e}"))),
    };

    let result = match request.event.as_str() {
        EVENT_CREATE => create(state, conn_id, request.data).await,
        EVENT_GET => get(state, conn_id, request.data).await,
        EVENT_ABORT => abort(state, request.data).await,
        other => Err(AppError::BadRequest(format!("Unknown event '{other}'"))),
    };

    match result {
        Ok(data) => WsReply {
            event: request.event,
            data,
        },
        Err(e) => exception(&e),
    }
}

async fn create(
    state: &AppState,
    conn_id: &str,
    data: serde_json::Value,
) -> AppResult<serde_json::Value> {
    let dto: CreateBulkActionDto = parse_data(data)?;
    let id = dto.id.trim().to_string();

    // Joined before the action starts so that no overview is missed.
    state.ws_manager.join(conn_id, &id).await;
    match state
        .bulk_actions
        .create(dto, Some(conn_id.to_string()))
        .await
    {
        Ok(overview) => to_value(&overview),
        Err(e) => {
            state.ws_manager.leave(conn_id, &id).await;
            Err(e)
        }
    }
}

async fn get(
    state: &AppState,
    conn_id: &str,
    data: serde_json::Value,
) -> AppResult<serde_json::Value> {
    let dto: BulkActionIdDto = parse_data(data)?;
    let overview = state.bulk_actions.overview(&dto.id).await?;
    state.ws_manager.join(conn_id, &dto.id).await;
    to_value(&overview)
}

async fn abort(state: &AppState, data: serde_json::Value) -> AppResult<serde_json::Value> {
    let dto: BulkActionIdDto = parse_data(data)?;
    let overview = state.bulk_actions.abort(&dto.id).await?;
    to_value(&overview)
}

fn parse_data<T: DeserializeOwned>(data: serde_json::Value) -> AppResult<T> {
    serde_json::from_value(data).map_err(|e| AppError::BadRequest(format!("Invalid payload: {e}")))
}

fn to_value<T: serde::Serialize>(value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::InternalError(e.to_string()))
}

fn exception(error: &AppError) -> WsReply {
    let (_, code, message) = error.parts();
    WsReply::exception(code, message)
}
