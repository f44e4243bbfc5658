//! Raw command upload worker for one primary node.

use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisResult;
use rebulk_core::commands::RawCommand;
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_engine::{
    ActionHandle, BulkActionError, NodeWorker, PrimaryNode, WorkerProgress, WorkerSummary,
};

use crate::error::{is_connection_error, RedisWorkerError};
use crate::slots::key_slot;

/// Whether `command` belongs to `node`.
///
/// Standalone nodes take every command. In a cluster a command goes to the
/// owner of its first argument's slot, and keyless commands go to the
/// owner of slot 0. A cluster node without slots takes nothing.
pub fn routes_to(node: &PrimaryNode, command: &RawCommand) -> bool {
    if node.standalone {
        return true;
    }
    let slot = command.routing_key().map_or(0, key_slot);
    node.owns_slot(slot)
}

/// Executes the commands routed to one node, one at a time and in upload
/// order. The command text stands in for the key in counters and report.
pub struct UploadWorker {
    node: PrimaryNode,
    action: ActionHandle,
    client: redis::Client,
    commands: Vec<RawCommand>,
    connection: Mutex<Option<MultiplexedConnection>>,
    progress: WorkerProgress,
    summary: WorkerSummary,
}

impl UploadWorker {
    /// Keep only the commands routed to `node`.
    pub fn new(
        node: PrimaryNode,
        action: ActionHandle,
        client: redis::Client,
        commands: &[RawCommand],
    ) -> Self {
        let commands = commands
            .iter()
            .filter(|c| routes_to(&node, c))
            .cloned()
            .collect();
        Self {
            node,
            action,
            client,
            commands,
            connection: Mutex::new(None),
            progress: WorkerProgress::default(),
            summary: WorkerSummary::default(),
        }
    }

    pub fn commands(&self) -> &[RawCommand] {
        &self.commands
    }

    fn connection(&self) -> Result<MultiplexedConnection, RedisWorkerError> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| RedisWorkerError::NotPrepared(self.node.address()))
    }

    async fn execute_all(&self) -> Result<(), RedisWorkerError> {
        let mut conn = self.connection()?;

        for command in &self.commands {
            if !self.action.is_running() {
                tracing::debug!(node = %self.node, "Upload worker stopped");
                return Ok(());
            }

            let mut cmd = redis::Cmd::new();
            for arg in &command.args {
                cmd.arg(arg.as_slice());
            }

            let reply: RedisResult<redis::Value> = cmd.query_async(&mut conn).await;
            match reply {
                Ok(_) => {
                    self.summary.add_success(command.text.as_bytes());
                    self.action.write_to_report(&command.text, None);
                }
                Err(e) if is_connection_error(&e) => return Err(e.into()),
                Err(e) => {
                    let message = e.to_string();
                    self.summary.add_failure(command.text.as_bytes(), message.as_str());
                    self.action.write_to_report(&command.text, Some(&message));
                }
            }

            self.progress.add_scanned(1);
            self.action.changed();
        }

        self.progress.finish();
        Ok(())
    }
}

#[async_trait]
impl NodeWorker for UploadWorker {
    fn node(&self) -> &PrimaryNode {
        &self.node
    }

    async fn prepare_to_start(&self) -> Result<(), BulkActionError> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| BulkActionError::Preparation(format!("{}: {e}", self.node)))?;

        self.progress.set_total(self.commands.len() as u64);
        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn);

        tracing::debug!(
            bulk_action_id = %self.action.id(),
            node = %self.node,
            commands = self.commands.len(),
            "Upload worker prepared",
        );
        Ok(())
    }

    async fn run(&self) -> Result<(), BulkActionError> {
        self.execute_all().await.map_err(|e| {
            tracing::warn!(node = %self.node, error = %e, "Upload worker failed");
            e.into()
        })
    }

    fn progress(&self) -> ProgressOverview {
        self.progress.overview()
    }

    fn summary(&self) -> SummaryOverview {
        self.summary.overview()
    }
}
