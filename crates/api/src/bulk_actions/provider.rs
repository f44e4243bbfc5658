use std::collections::HashMap;
use std::sync::Arc;

use rebulk_core::error::CoreError;
use rebulk_core::overview::BulkActionOverview;
use rebulk_core::types::BulkActionId;
use rebulk_engine::{
    BulkAction, BulkActionAnalytics, BulkActionError, BulkActionParams, BulkActionSettings,
};
use rebulk_events::EventBus;
use tokio::sync::RwLock;

use super::backend::BulkActionBackend;
use super::dto::CreateBulkActionDto;
use crate::error::{AppError, AppResult};

/// A registered bulk action and the WebSocket connection that created it.
struct Entry {
    action: Arc<BulkAction>,
    owner: Option<String>,
}

/// Registry of live bulk actions, keyed by their client-chosen id.
///
/// Designed to be wrapped in `Arc` and shared through `AppState`.
pub struct BulkActionsProvider {
    actions: RwLock<HashMap<BulkActionId, Entry>>,
    backend: Arc<dyn BulkActionBackend>,
    bus: Arc<EventBus>,
    analytics: Arc<dyn BulkActionAnalytics>,
    settings: BulkActionSettings,
}

impl BulkActionsProvider {
    pub fn new(
        backend: Arc<dyn BulkActionBackend>,
        bus: Arc<EventBus>,
        analytics: Arc<dyn BulkActionAnalytics>,
        settings: BulkActionSettings,
    ) -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
            backend,
            bus,
            analytics,
            settings,
        }
    }

    /// Validate, prepare and start a new bulk action.
    ///
    /// The id is reserved before preparation so that a concurrent create
    /// with the same id fails with `Conflict`. A failed preparation
    /// releases it again.
    pub async fn create(
        &self,
        dto: CreateBulkActionDto,
        owner: Option<String>,
    ) -> AppResult<BulkActionOverview> {
        let request = dto.validate()?;
        let plan = self.backend.plan(&request)?;

        let action = BulkAction::new(
            BulkActionParams {
                id: request.id.clone(),
                database_id: request.database_id.clone(),
                action_type: request.action_type,
                filter: request.filter.clone(),
                generate_report: request.generate_report,
            },
            Arc::clone(&self.bus),
            Arc::clone(&self.analytics),
            self.settings,
        );

        {
            let mut actions = self.actions.write().await;
            if actions.contains_key(&request.id) {
                return Err(CoreError::Conflict(format!(
                    "Bulk action {} already exists",
                    request.id
                ))
                .into());
            }
            actions.insert(
                request.id.clone(),
                Entry {
                    action: Arc::clone(&action),
                    owner,
                },
            );
        }

        let started: Result<BulkActionOverview, BulkActionError> = async {
            action
                .prepare(plan.connection.as_ref(), plan.factory.as_ref())
                .await?;
            action.start()
        }
        .await;

        match started {
            Ok(overview) => {
                tracing::info!(
                    bulk_action_id = %request.id,
                    database_id = %request.database_id,
                    action_type = %request.action_type,
                    "Bulk action created",
                );
                Ok(overview)
            }
            Err(e) => {
                tracing::warn!(
                    bulk_action_id = %request.id,
                    error = %e,
                    "Bulk action failed to start",
                );
                self.actions.write().await.remove(&request.id);
                Err(AppError::from(e))
            }
        }
    }

    /// The live action with this id.
    pub async fn get(&self, id: &str) -> Result<Arc<BulkAction>, CoreError> {
        self.actions
            .read()
            .await
            .get(id)
            .map(|entry| Arc::clone(&entry.action))
            .ok_or_else(|| not_found(id))
    }

    pub async fn overview(&self, id: &str) -> Result<BulkActionOverview, CoreError> {
        Ok(self.get(id).await?.overview())
    }

    /// Abort an action and drop it from the registry.
    pub async fn abort(&self, id: &str) -> Result<BulkActionOverview, CoreError> {
        let entry = self
            .actions
            .write()
            .await
            .remove(id)
            .ok_or_else(|| not_found(id))?;

        entry.action.abort();
        tracing::info!(bulk_action_id = %id, "Bulk action aborted");
        Ok(entry.action.overview())
    }

    /// Abort and drop every action created by `conn_id`.
    ///
    /// Returns the number of actions aborted.
    pub async fn abort_owned_by(&self, conn_id: &str) -> usize {
        let owned: Vec<Entry> = {
            let mut actions = self.actions.write().await;
            let ids: Vec<BulkActionId> = actions
                .iter()
                .filter(|(_, entry)| entry.owner.as_deref() == Some(conn_id))
                .map(|(id, _)| id.clone())
                .collect();
            ids.iter().filter_map(|id| actions.remove(id)).collect()
        };

        for entry in &owned {
            entry.action.abort();
            tracing::info!(
                bulk_action_id = %entry.action.id(),
                conn_id = %conn_id,
                "Bulk action aborted on disconnect",
            );
        }
        owned.len()
    }

    /// Abort and drop every registered action. Used on shutdown.
    pub async fn abort_all(&self) -> usize {
        let drained: Vec<Entry> = self.actions.write().await.drain().map(|(_, e)| e).collect();
        for entry in &drained {
            entry.action.abort();
        }
        drained.len()
    }

    pub async fn len(&self) -> usize {
        self.actions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.actions.read().await.is_empty()
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "BulkAction",
        id: id.to_string(),
    }
}
