//! Seams between the coordinator and the per-node execution units.
//!
//! The coordinator knows nothing about how keys are scanned or commands
//! executed. It asks a [`ConnectionHandle`] for the primary nodes, builds
//! one [`NodeWorker`] per node through a [`NodeWorkerFactory`], and hands
//! every worker an [`ActionHandle`] to report back through.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_core::status::BulkActionStatus;

use crate::bulk_action::BulkAction;
use crate::error::BulkActionError;

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// An inclusive range of cluster hash slots.
pub type SlotRange = (u16, u16);

/// A primary node of the target database.
///
/// For a standalone database this is the server itself. A cluster primary
/// may own no slot ranges at all, for instance right after it joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryNode {
    /// Cluster node id, or the address for standalone servers.
    pub id: String,
    pub host: String,
    pub port: u16,
    pub slots: Vec<SlotRange>,
    /// `true` when the database is not a cluster.
    pub standalone: bool,
}

impl PrimaryNode {
    pub fn standalone(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self {
            id: format!("{host}:{port}"),
            host,
            port,
            slots: Vec::new(),
            standalone: true,
        }
    }

    pub fn cluster(
        id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        slots: Vec<SlotRange>,
    ) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            slots,
            standalone: false,
        }
    }

    /// `host:port` of the node.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this node serves `slot`.
    pub fn owns_slot(&self, slot: u16) -> bool {
        self.slots
            .iter()
            .any(|&(start, end)| (start..=end).contains(&slot))
    }
}

impl fmt::Display for PrimaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Access to a database's topology.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Every primary node, one entry per node.
    async fn primary_nodes(&self) -> Result<Vec<PrimaryNode>, BulkActionError>;
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// The unit of work for one primary node.
///
/// `progress` and `summary` must be safe to call at any time, including
/// concurrently with `run`.
#[async_trait]
pub trait NodeWorker: Send + Sync {
    fn node(&self) -> &PrimaryNode;

    /// Pre-flight step, e.g. connecting and counting keys.
    async fn prepare_to_start(&self) -> Result<(), BulkActionError>;

    /// Execute this node's share of the action to completion.
    async fn run(&self) -> Result<(), BulkActionError>;

    fn progress(&self) -> ProgressOverview;

    fn summary(&self) -> SummaryOverview;
}

/// Builds the worker for one node.
pub trait NodeWorkerFactory: Send + Sync {
    fn create(&self, action: ActionHandle, node: PrimaryNode) -> Arc<dyn NodeWorker>;
}

impl<F> NodeWorkerFactory for F
where
    F: Fn(ActionHandle, PrimaryNode) -> Arc<dyn NodeWorker> + Send + Sync,
{
    fn create(&self, action: ActionHandle, node: PrimaryNode) -> Arc<dyn NodeWorker> {
        self(action, node)
    }
}

// ---------------------------------------------------------------------------
// ActionHandle
// ---------------------------------------------------------------------------

/// A worker's view of the bulk action that owns it.
///
/// Holds a weak reference, so workers never keep a finished action alive.
/// Once the action is dropped every method degrades to a no-op.
#[derive(Clone)]
pub struct ActionHandle {
    action: Weak<BulkAction>,
}

impl ActionHandle {
    pub(crate) fn new(action: Weak<BulkAction>) -> Self {
        Self { action }
    }

    /// A handle bound to no action, on which every method is a no-op.
    pub fn detached() -> Self {
        Self::new(Weak::new())
    }

    /// Append one line to the report, if a report stream is attached.
    pub fn write_to_report(&self, key: &str, error: Option<&str>) {
        if let Some(action) = self.action.upgrade() {
            action.write_to_report(key, error);
        }
    }

    /// Signal that counters changed; schedules a debounced overview.
    pub fn changed(&self) {
        if let Some(action) = self.action.upgrade() {
            action.notify_changed();
        }
    }

    /// Workers keep going only while this returns `true`; an abort flips it.
    pub fn is_running(&self) -> bool {
        self.action
            .upgrade()
            .is_some_and(|action| action.status() == BulkActionStatus::Running)
    }

    /// Id of the owning bulk action, for log fields.
    pub fn id(&self) -> String {
        self.action
            .upgrade()
            .map(|action| action.id().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ActionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionHandle")
            .field("alive", &(self.action.strong_count() > 0))
            .finish()
    }
}
