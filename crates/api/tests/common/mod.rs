//! Test app construction with scripted workers in place of Redis.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rebulk_core::error::CoreError;
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_engine::{
    ActionHandle, BulkActionError, BulkActionSettings, ConnectionHandle, NodeWorker,
    PrimaryNode, TracingAnalytics, WorkerProgress, WorkerSummary,
};
use rebulk_events::EventBus;
use tower::ServiceExt;

use rebulk_api::bulk_actions::{
    BulkActionBackend, BulkActionRequest, BulkActionsProvider, WorkerPlan,
};
use rebulk_api::config::{DatabaseConfig, ServerConfig};
use rebulk_api::router::build_app_router;
use rebulk_api::state::AppState;
use rebulk_api::ws::WsManager;

/// Id of the only database the fake backend knows.
pub const TEST_DB: &str = "db-1";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        databases: vec![DatabaseConfig {
            id: TEST_DB.to_string(),
            url: "redis://127.0.0.1:6379".to_string(),
        }],
        report_wait_ms: 2000,
        notify_window_ms: 20,
        scan_count: 100,
    }
}

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

struct SingleNode;

#[async_trait]
impl ConnectionHandle for SingleNode {
    async fn primary_nodes(&self) -> Result<Vec<PrimaryNode>, BulkActionError> {
        Ok(vec![PrimaryNode::standalone("127.0.0.1", 6379)])
    }
}

/// Processes `keys` keys named `key:<i>`, pausing `delay` before each.
struct KeyWorker {
    node: PrimaryNode,
    action: ActionHandle,
    keys: usize,
    delay: Duration,
    progress: WorkerProgress,
    summary: WorkerSummary,
}

#[async_trait]
impl NodeWorker for KeyWorker {
    fn node(&self) -> &PrimaryNode {
        &self.node
    }

    async fn prepare_to_start(&self) -> Result<(), BulkActionError> {
        self.progress.set_total(self.keys as u64);
        Ok(())
    }

    async fn run(&self) -> Result<(), BulkActionError> {
        for i in 0..self.keys {
            tokio::time::sleep(self.delay).await;
            if !self.action.is_running() {
                return Ok(());
            }
            let key = format!("key:{i}");
            self.progress.add_scanned(1);
            self.summary.add_success(key.as_bytes());
            self.action.write_to_report(&key, None);
            self.action.changed();
        }
        self.progress.finish();
        Ok(())
    }

    fn progress(&self) -> ProgressOverview {
        self.progress.overview()
    }

    fn summary(&self) -> SummaryOverview {
        self.summary.overview()
    }
}

/// Plans every action onto one node running a [`KeyWorker`].
pub struct FakeBackend {
    pub keys: usize,
    pub delay: Duration,
}

impl FakeBackend {
    pub fn new(keys: usize, delay: Duration) -> Self {
        Self { keys, delay }
    }
}

impl BulkActionBackend for FakeBackend {
    fn plan(&self, request: &BulkActionRequest) -> Result<WorkerPlan, CoreError> {
        if request.database_id != TEST_DB {
            return Err(CoreError::NotFound {
                entity: "Database",
                id: request.database_id.clone(),
            });
        }

        let (keys, delay) = (self.keys, self.delay);
        let factory = move |action: ActionHandle, node: PrimaryNode| -> Arc<dyn NodeWorker> {
            Arc::new(KeyWorker {
                node,
                action,
                keys,
                delay,
                progress: WorkerProgress::default(),
                summary: WorkerSummary::default(),
            })
        };

        Ok(WorkerPlan {
            connection: Arc::new(SingleNode),
            factory: Arc::new(factory),
        })
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The router plus the state behind it, for tests that drive both.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn build_test_app(backend: FakeBackend) -> TestApp {
    let config = test_config();
    let ws_manager = Arc::new(WsManager::new());
    let event_bus = Arc::new(EventBus::default());
    let bulk_actions = Arc::new(BulkActionsProvider::new(
        Arc::new(backend),
        Arc::clone(&event_bus),
        Arc::new(TracingAnalytics),
        config.bulk_action_settings(),
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        ws_manager,
        event_bus,
        bulk_actions,
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
