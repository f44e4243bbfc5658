//! Delete-by-filter worker for one primary node.

use std::sync::Mutex;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisResult;
use rebulk_core::filter::BulkActionFilter;
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_engine::{
    ActionHandle, BulkActionError, NodeWorker, PrimaryNode, WorkerProgress, WorkerSummary,
};

use crate::error::{is_connection_error, RedisWorkerError};

/// Default `SCAN ... COUNT` hint.
pub const DEFAULT_SCAN_COUNT: u64 = 10_000;

/// Scans one node for keys matching the filter and deletes them batch by
/// batch.
pub struct DeleteWorker {
    node: PrimaryNode,
    action: ActionHandle,
    client: redis::Client,
    filter: BulkActionFilter,
    scan_count: u64,
    connection: Mutex<Option<MultiplexedConnection>>,
    progress: WorkerProgress,
    summary: WorkerSummary,
}

impl DeleteWorker {
    pub fn new(
        node: PrimaryNode,
        action: ActionHandle,
        client: redis::Client,
        filter: BulkActionFilter,
        scan_count: u64,
    ) -> Self {
        Self {
            node,
            action,
            client,
            filter,
            scan_count: scan_count.max(1),
            connection: Mutex::new(None),
            progress: WorkerProgress::default(),
            summary: WorkerSummary::default(),
        }
    }

    fn connection(&self) -> Result<MultiplexedConnection, RedisWorkerError> {
        self.connection
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| RedisWorkerError::NotPrepared(self.node.address()))
    }

    fn scan_command(&self, cursor: u64) -> redis::Cmd {
        let mut cmd = redis::cmd("SCAN");
        cmd.arg(cursor)
            .arg("MATCH")
            .arg(self.filter.pattern())
            .arg("COUNT")
            .arg(self.scan_count);
        if let Some(key_type) = self.filter.key_type() {
            cmd.arg("TYPE").arg(key_type.redis_name());
        }
        cmd
    }

    async fn scan_and_delete(&self) -> Result<(), RedisWorkerError> {
        let mut conn = self.connection()?;
        let mut cursor: u64 = 0;

        loop {
            if !self.action.is_running() {
                tracing::debug!(node = %self.node, "Delete worker stopped");
                return Ok(());
            }

            let (next, keys): (u64, Vec<Vec<u8>>) =
                self.scan_command(cursor).query_async(&mut conn).await?;
            self.progress.add_scanned(self.scan_count);

            if !keys.is_empty() {
                self.delete_batch(&mut conn, &keys).await?;
            }
            self.action.changed();

            cursor = next;
            if cursor == 0 {
                self.progress.finish();
                return Ok(());
            }
        }
    }

    /// Delete one scanned batch with a single pipeline. When the server
    /// rejects any command of the pipeline, falls back to one `DEL` per
    /// key so each key gets its own outcome.
    async fn delete_batch(
        &self,
        conn: &mut MultiplexedConnection,
        keys: &[Vec<u8>],
    ) -> Result<(), RedisWorkerError> {
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("DEL").arg(key.as_slice());
        }

        let batch: RedisResult<Vec<i64>> = pipe.query_async(conn).await;
        match batch {
            Ok(_) => {
                for key in keys {
                    self.record(key, None);
                }
            }
            Err(e) if is_connection_error(&e) => return Err(e.into()),
            Err(e) => {
                tracing::debug!(node = %self.node, error = %e, "Pipelined DEL rejected, retrying per key");
                for key in keys {
                    let deleted: RedisResult<i64> =
                        redis::cmd("DEL").arg(key.as_slice()).query_async(conn).await;
                    match deleted {
                        Ok(_) => self.record(key, None),
                        Err(e) if is_connection_error(&e) => return Err(e.into()),
                        Err(e) => self.record(key, Some(&e.to_string())),
                    }
                }
            }
        }
        Ok(())
    }

    fn record(&self, key: &[u8], error: Option<&str>) {
        match error {
            None => self.summary.add_success(key),
            Some(message) => self.summary.add_failure(key, message),
        }
        self.action
            .write_to_report(&String::from_utf8_lossy(key), error);
    }
}

#[async_trait]
impl NodeWorker for DeleteWorker {
    fn node(&self) -> &PrimaryNode {
        &self.node
    }

    async fn prepare_to_start(&self) -> Result<(), BulkActionError> {
        let prepare = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            let total: u64 = redis::cmd("DBSIZE").query_async(&mut conn).await?;
            Ok::<_, RedisWorkerError>((conn, total))
        };
        let (conn, total) = prepare
            .await
            .map_err(|e| BulkActionError::Preparation(format!("{}: {e}", self.node)))?;

        self.progress.set_total(total);
        *self.connection.lock().unwrap_or_else(|e| e.into_inner()) = Some(conn);

        tracing::debug!(
            bulk_action_id = %self.action.id(),
            node = %self.node,
            total,
            "Delete worker prepared",
        );
        Ok(())
    }

    async fn run(&self) -> Result<(), BulkActionError> {
        self.scan_and_delete().await.map_err(|e| {
            tracing::warn!(node = %self.node, error = %e, "Delete worker failed");
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
