//! Scripted workers, topologies and sinks shared by the engine tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rebulk_core::filter::BulkActionFilter;
use rebulk_core::overview::BulkActionOverview;
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_core::status::BulkActionType;
use rebulk_engine::{
    ActionHandle, BulkAction, BulkActionAnalytics, BulkActionError, BulkActionParams,
    BulkActionSettings, ConnectionHandle, NodeWorker, NodeWorkerFactory, PrimaryNode, ReportSink,
    WorkerProgress, WorkerSummary,
};
use rebulk_events::{BulkActionEvent, EventBus};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Returns a fixed list of primary nodes, or a connection error.
pub struct FakeConnection {
    pub nodes: Result<Vec<PrimaryNode>, String>,
}

impl FakeConnection {
    pub fn with_nodes(count: u16) -> Self {
        let nodes = (0..count)
            .map(|i| PrimaryNode::standalone("127.0.0.1", 7000 + i))
            .collect();
        Self { nodes: Ok(nodes) }
    }

    pub fn unreachable() -> Self {
        Self {
            nodes: Err("connection refused".into()),
        }
    }
}

#[async_trait]
impl ConnectionHandle for FakeConnection {
    async fn primary_nodes(&self) -> Result<Vec<PrimaryNode>, BulkActionError> {
        self.nodes.clone().map_err(BulkActionError::Connection)
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// What a scripted worker does for its node.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Keys processed successfully, in order.
    pub ok: Vec<String>,
    /// Keys that fail with the given message, processed after `ok`.
    pub failing: Vec<(String, String)>,
    /// Pause between keys.
    pub delay: Option<Duration>,
    /// Make `prepare_to_start` fail.
    pub fail_prepare: bool,
    /// Make `run` fail after processing its keys.
    pub fail_run: Option<String>,
}

impl Script {
    pub fn keys(ok: usize, failing: usize) -> Self {
        Self {
            ok: (0..ok).map(|i| format!("key:{i}")).collect(),
            failing: (0..failing)
                .map(|i| (format!("bad:{i}"), "WRONGTYPE".to_string()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn total(&self) -> u64 {
        (self.ok.len() + self.failing.len()) as u64
    }
}

pub struct ScriptedWorker {
    node: PrimaryNode,
    action: ActionHandle,
    script: Script,
    progress: WorkerProgress,
    summary: WorkerSummary,
}

#[async_trait]
impl NodeWorker for ScriptedWorker {
    fn node(&self) -> &PrimaryNode {
        &self.node
    }

    async fn prepare_to_start(&self) -> Result<(), BulkActionError> {
        if self.script.fail_prepare {
            return Err(BulkActionError::Preparation(format!("{} is loading", self.node)));
        }
        self.progress.set_total(self.script.total());
        Ok(())
    }

    async fn run(&self) -> Result<(), BulkActionError> {
        let failing = self
            .script
            .failing
            .iter()
            .map(|(key, error)| (key, Some(error.as_str())));
        let keys = self.script.ok.iter().map(|key| (key, None)).chain(failing);

        for (key, error) in keys {
            if let Some(delay) = self.script.delay {
                tokio::time::sleep(delay).await;
            }
            if !self.action.is_running() {
                return Ok(());
            }
            self.progress.add_scanned(1);
            match error {
                None => self.summary.add_success(key.as_bytes()),
                Some(message) => self.summary.add_failure(key.as_bytes(), message),
            }
            self.action.write_to_report(key, error);
            self.action.changed();
        }

        self.progress.finish();
        match &self.script.fail_run {
            Some(message) => Err(BulkActionError::Execution(message.clone())),
            None => Ok(()),
        }
    }

    fn progress(&self) -> ProgressOverview {
        self.progress.overview()
    }

    fn summary(&self) -> SummaryOverview {
        self.summary.overview()
    }
}

/// Hands out one scripted worker per node, in node order.
#[derive(Default)]
pub struct ScriptedFactory {
    scripts: HashMap<String, Script>,
    default: Script,
}

impl ScriptedFactory {
    pub fn uniform(script: Script) -> Self {
        Self {
            scripts: HashMap::new(),
            default: script,
        }
    }

    /// Scripts for nodes created by [`FakeConnection::with_nodes`], by index.
    pub fn per_node(scripts: Vec<Script>) -> Self {
        let scripts = scripts
            .into_iter()
            .enumerate()
            .map(|(i, script)| (format!("127.0.0.1:{}", 7000 + i), script))
            .collect();
        Self {
            scripts,
            default: Script::default(),
        }
    }
}

impl NodeWorkerFactory for ScriptedFactory {
    fn create(&self, action: ActionHandle, node: PrimaryNode) -> Arc<dyn NodeWorker> {
        let script = self
            .scripts
            .get(&node.id)
            .cloned()
            .unwrap_or_else(|| self.default.clone());
        Arc::new(ScriptedWorker {
            node,
            action,
            script,
            progress: WorkerProgress::default(),
            summary: WorkerSummary::default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Report sink
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct RecordingSink {
    chunks: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<u32>>,
}

impl RecordingSink {
    pub fn text(&self) -> String {
        self.chunks.lock().unwrap().concat()
    }

    pub fn close_count(&self) -> u32 {
        *self.closed.lock().unwrap()
    }
}

impl ReportSink for RecordingSink {
    fn write(&mut self, chunk: &str) -> io::Result<()> {
        self.chunks.lock().unwrap().push(chunk.to_string());
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingAnalytics {
    pub outcomes: Mutex<Vec<String>>,
}

impl RecordingAnalytics {
    pub fn outcomes(&self) -> Vec<String> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl BulkActionAnalytics for RecordingAnalytics {
    fn completed(&self, _overview: &BulkActionOverview) {
        self.outcomes.lock().unwrap().push("completed".into());
    }

    fn failed(&self, _overview: &BulkActionOverview, error: &str) {
        self.outcomes.lock().unwrap().push(format!("failed: {error}"));
    }

    fn stopped(&self, _overview: &BulkActionOverview) {
        self.outcomes.lock().unwrap().push("stopped".into());
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub action: Arc<BulkAction>,
    pub bus: Arc<EventBus>,
    pub events: broadcast::Receiver<BulkActionEvent>,
    pub analytics: Arc<RecordingAnalytics>,
}

pub fn harness(generate_report: bool) -> Harness {
    let bus = Arc::new(EventBus::default());
    let events = bus.subscribe();
    let analytics = Arc::new(RecordingAnalytics::default());
    let action = BulkAction::new(
        BulkActionParams {
            id: "bulk-1".into(),
            database_id: "db-1".into(),
            action_type: BulkActionType::Delete,
            filter: BulkActionFilter::default(),
            generate_report,
        },
        Arc::clone(&bus),
        analytics.clone(),
        BulkActionSettings::default(),
    );
    Harness {
        action,
        bus,
        events,
        analytics,
    }
}

/// Receive overview events until one carries a terminal status.
pub async fn wait_for_terminal(
    events: &mut broadcast::Receiver<BulkActionEvent>,
) -> BulkActionOverview {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = events.recv().await.expect("event bus closed");
            let overview: BulkActionOverview =
                serde_json::from_value(event.payload).expect("overview payload");
            if overview.status.is_terminal() {
                return overview;
            }
        }
    })
    .await
    .expect("bulk action never reached a terminal status")
}
