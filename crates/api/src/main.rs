use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rebulk_api::bulk_actions::{BulkActionsProvider, RedisBackend};
use rebulk_api::config::ServerConfig;
use rebulk_api::notifications::OverviewRelay;
use rebulk_api::router::build_app_router;
use rebulk_api::state::AppState;
use rebulk_api::ws;
use rebulk_engine::TracingAnalytics;
use rebulk_events::EventBus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rebulk_api=debug,rebulk_engine=debug,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        databases = config.databases.len(),
        "Loaded server configuration",
    );

    // --- Redis databases ---
    let backend = RedisBackend::from_config(&config.databases, config.scan_count)
        .context("Invalid REDIS_DATABASES")?;
    for id in backend.database_ids() {
        tracing::info!(database_id = %id, "Registered Redis database");
    }

    // --- WebSocket manager ---
    let ws_manager = Arc::new(ws::WsManager::new());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&ws_manager));

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());

    // Spawn the overview relay (routes overview events to WebSocket rooms).
    let relay_cancel = CancellationToken::new();
    let relay = OverviewRelay::new(Arc::clone(&ws_manager));
    let relay_handle = tokio::spawn(relay.run(event_bus.subscribe(), relay_cancel.clone()));
    tracing::info!("Overview relay started");

    // --- Bulk actions registry ---
    let bulk_actions = Arc::new(BulkActionsProvider::new(
        Arc::new(backend),
        Arc::clone(&event_bus),
        Arc::new(TracingAnalytics),
        config.bulk_action_settings(),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        event_bus: Arc::clone(&event_bus),
        bulk_actions: Arc::clone(&bulk_actions),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    let aborted = bulk_actions.abort_all().await;
    tracing::info!(aborted, "Aborted running bulk actions");

    relay_cancel.cancel();
    if tokio::time::timeout(grace, relay_handle).await.is_err() {
        tracing::warn!("Overview relay did not stop in time");
    }

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
