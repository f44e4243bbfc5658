use std::sync::Arc;

use rebulk_core::commands::RawCommand;
use rebulk_core::filter::BulkActionFilter;
use rebulk_core::status::BulkActionType;
use rebulk_engine::{ActionHandle, NodeWorker, NodeWorkerFactory, PrimaryNode};

use crate::client::RedisDatabase;
use crate::delete_worker::{DeleteWorker, DEFAULT_SCAN_COUNT};
use crate::upload_worker::UploadWorker;

/// What the workers built by a [`RedisWorkerFactory`] do.
#[derive(Debug, Clone)]
pub enum WorkerKind {
    Delete {
        filter: BulkActionFilter,
        scan_count: u64,
    },
    Upload {
        commands: Arc<[RawCommand]>,
    },
}

/// Builds Redis node workers of one kind for one database.
#[derive(Debug, Clone)]
pub struct RedisWorkerFactory {
    database: RedisDatabase,
    kind: WorkerKind,
}

impl RedisWorkerFactory {
    pub fn delete(database: RedisDatabase, filter: BulkActionFilter) -> Self {
        Self {
            database,
            kind: WorkerKind::Delete {
                filter,
                scan_count: DEFAULT_SCAN_COUNT,
            },
        }
    }

    pub fn upload(database: RedisDatabase, commands: Vec<RawCommand>) -> Self {
        Self {
            database,
            kind: WorkerKind::Upload {
                commands: commands.into(),
            },
        }
    }

    /// Override the `SCAN ... COUNT` hint of delete workers.
    pub fn with_scan_count(mut self, count: u64) -> Self {
        if let WorkerKind::Delete { scan_count, .. } = &mut self.kind {
            *scan_count = count;
        }
        self
    }

    pub fn action_type(&self) -> BulkActionType {
        match self.kind {
            WorkerKind::Delete { .. } => BulkActionType::Delete,
            WorkerKind::Upload { .. } => BulkActionType::Upload,
        }
    }

    pub fn database(&self) -> &RedisDatabase {
        &self.database
    }
}

impl NodeWorkerFactory for RedisWorkerFactory {
    fn create(&self, action: ActionHandle, node: PrimaryNode) -> Arc<dyn NodeWorker> {
        // A node URL that fails to parse still yields a worker; its
        // preparation then fails against the seed client instead.
        let client = self.database.node_client(&node).unwrap_or_else(|e| {
            tracing::warn!(node = %node, error = %e, "Falling back to the seed client");
            self.database.seed_client()
        });

        match &self.kind {
            WorkerKind::Delete { filter, scan_count } => Arc::new(DeleteWorker::new(
                node,
                action,
                client,
                filter.clone(),
                *scan_count,
            )),
            WorkerKind::Upload { commands } => {
                Arc::new(UploadWorker::new(node, action, client, commands))
            }
        }
    }
}
