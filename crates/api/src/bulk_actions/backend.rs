//! Resolution of a validated request into the engine's collaborators.

use std::collections::HashMap;
use std::sync::Arc;

use rebulk_core::error::CoreError;
use rebulk_core::status::BulkActionType;
use rebulk_engine::{ConnectionHandle, NodeWorkerFactory};
use rebulk_redis::{RedisDatabase, RedisWorkerFactory};

use super::dto::BulkActionRequest;
use crate::config::DatabaseConfig;

/// Topology handle and worker factory for one bulk action.
pub struct WorkerPlan {
    pub connection: Arc<dyn ConnectionHandle>,
    pub factory: Arc<dyn NodeWorkerFactory>,
}

impl std::fmt::Debug for WorkerPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPlan").finish_non_exhaustive()
    }
}

/// Source of worker plans. The Redis implementation is used in
/// production; tests substitute scripted workers.
pub trait BulkActionBackend: Send + Sync {
    fn plan(&self, request: &BulkActionRequest) -> Result<WorkerPlan, CoreError>;
}

/// Plans bulk actions against the configured Redis databases.
#[derive(Debug)]
pub struct RedisBackend {
    databases: HashMap<String, RedisDatabase>,
    scan_count: u64,
}

impl RedisBackend {
    /// Open a client for every configured database. URLs are validated
    /// here; no connection is made until a bulk action prepares.
    pub fn from_config(databases: &[DatabaseConfig], scan_count: u64) -> Result<Self, CoreError> {
        let mut opened = HashMap::with_capacity(databases.len());
        for db in databases {
            let database = RedisDatabase::open(db.id.clone(), &db.url).map_err(|e| {
                CoreError::Validation(format!("Database {} has an invalid URL: {e}", db.id))
            })?;
            opened.insert(db.id.clone(), database);
        }
        Ok(Self {
            databases: opened,
            scan_count,
        })
    }

    pub fn database_ids(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}

impl BulkActionBackend for RedisBackend {
    fn plan(&self, request: &BulkActionRequest) -> Result<WorkerPlan, CoreError> {
        let database = self
            .databases
            .get(&request.database_id)
            .ok_or_else(|| CoreError::NotFound {
                entity: "Database",
                id: request.database_id.clone(),
            })?;

        let factory = match request.action_type {
            BulkActionType::Delete => {
                RedisWorkerFactory::delete(database.clone(), request.filter.clone())
                    .with_scan_count(self.scan_count)
            }
            BulkActionType::Upload => {
                RedisWorkerFactory::upload(database.clone(), request.commands.clone())
            }
        };

        Ok(WorkerPlan {
            connection: Arc::new(database.clone()),
            factory: Arc::new(factory),
        })
    }
}
