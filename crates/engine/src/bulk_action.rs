//! The bulk action coordinator.
//!
//! A [`BulkAction`] owns one [`NodeWorker`] per primary node and moves
//! through `Initialized -> Preparing -> Ready -> Running` to exactly one
//! of `Completed`, `Failed` or `Aborted`. All status changes go through
//! [`BulkAction::set_status`], which applies the effects returned by
//! [`BulkActionStatus::transition`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};

use chrono::Utc;
use futures::future::try_join_all;
use rebulk_core::filter::BulkActionFilter;
use rebulk_core::overview::{self, BulkActionOverview};
use rebulk_core::progress::{ProgressOverview, SummaryOverview};
use rebulk_core::status::{BulkActionStatus, BulkActionType, StatusEffect};
use rebulk_core::types::{BulkActionId, DatabaseId, Timestamp};
use rebulk_events::debounce::DebouncedFn;
use rebulk_events::{BulkActionEvent, Debouncer, EventBus};

use crate::analytics::BulkActionAnalytics;
use crate::error::BulkActionError;
use crate::report::{ReportSink, ReportStreamer};
use crate::settings::BulkActionSettings;
use crate::worker::{ActionHandle, ConnectionHandle, NodeWorker, NodeWorkerFactory};

/// Identity and options of a bulk action, fixed at creation.
#[derive(Debug, Clone)]
pub struct BulkActionParams {
    pub id: BulkActionId,
    pub database_id: DatabaseId,
    pub action_type: BulkActionType,
    pub filter: BulkActionFilter,
    pub generate_report: bool,
}

/// Mutable lifecycle fields, guarded together.
struct Lifecycle {
    status: BulkActionStatus,
    end_time: Option<Timestamp>,
    error: Option<String>,
}

/// One bulk operation across every primary node of a database.
///
/// Always handled through an `Arc`; see [`BulkAction::new`].
pub struct BulkAction {
    id: BulkActionId,
    database_id: DatabaseId,
    action_type: BulkActionType,
    filter: BulkActionFilter,
    start_time: Timestamp,
    lifecycle: Mutex<Lifecycle>,
    workers: RwLock<Vec<Arc<dyn NodeWorker>>>,
    started: AtomicBool,
    outcome_reported: AtomicBool,
    report: ReportStreamer,
    debouncer: Debouncer,
    bus: Arc<EventBus>,
    analytics: Arc<dyn BulkActionAnalytics>,
    self_ref: Weak<BulkAction>,
}

impl BulkAction {
    /// Create a bulk action in `Initialized` status.
    pub fn new(
        params: BulkActionParams,
        bus: Arc<EventBus>,
        analytics: Arc<dyn BulkActionAnalytics>,
        settings: BulkActionSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<BulkAction>| {
            let notify_target = weak.clone();
            let callback: DebouncedFn = Arc::new(move || {
                if let Some(action) = notify_target.upgrade() {
                    action.send_overview();
                }
            });

            Self {
                report: ReportStreamer::new(
                    params.generate_report,
                    params.action_type,
                    settings.report_wait,
                ),
                debouncer: Debouncer::with_window(settings.notify_window, callback),
                id: params.id,
                database_id: params.database_id,
                action_type: params.action_type,
                filter: params.filter,
                start_time: Utc::now(),
                lifecycle: Mutex::new(Lifecycle {
                    status: BulkActionStatus::Initialized,
                    end_time: None,
                    error: None,
                }),
                workers: RwLock::new(Vec::new()),
                started: AtomicBool::new(false),
                outcome_reported: AtomicBool::new(false),
                bus,
                analytics,
                self_ref: weak.clone(),
            }
        })
    }

    // ---- accessors ----

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn action_type(&self) -> BulkActionType {
        self.action_type
    }

    pub fn filter(&self) -> &BulkActionFilter {
        &self.filter
    }

    pub fn status(&self) -> BulkActionStatus {
        self.lifecycle().status
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.lifecycle().end_time
    }

    pub fn error(&self) -> Option<String> {
        self.lifecycle().error.clone()
    }

    pub fn is_report_enabled(&self) -> bool {
        self.report.is_enabled()
    }

    /// Relative download URL of the report, when reporting is enabled.
    pub fn download_url(&self) -> Option<String> {
        self.is_report_enabled()
            .then(|| overview::download_url(&self.database_id, &self.id))
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn workers(&self) -> Vec<Arc<dyn NodeWorker>> {
        self.workers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    // ---- lifecycle ----

    /// Create one worker per primary node and run every worker's
    /// pre-flight step concurrently. Valid only from `Initialized`.
    pub async fn prepare(
        &self,
        connection: &dyn ConnectionHandle,
        factory: &dyn NodeWorkerFactory,
    ) -> Result<(), BulkActionError> {
        self.transition_from(BulkActionStatus::Initialized, BulkActionStatus::Preparing)?;

        let nodes = connection.primary_nodes().await?;
        let handle = ActionHandle::new(self.self_ref.clone());
        let workers: Vec<Arc<dyn NodeWorker>> = nodes
            .into_iter()
            .map(|node| factory.create(handle.clone(), node))
            .collect();

        tracing::info!(
            bulk_action_id = %self.id,
            nodes = workers.len(),
            "Preparing bulk action",
        );

        *self.workers.write().unwrap_or_else(|e| e.into_inner()) = workers.clone();

        try_join_all(workers.iter().map(|w| w.prepare_to_start())).await?;

        self.set_status(BulkActionStatus::Ready);
        Ok(())
    }

    /// Launch execution in the background and return the current
    /// overview. Valid only from `Ready`, and only once.
    pub fn start(&self) -> Result<BulkActionOverview, BulkActionError> {
        let status = self.status();
        if status != BulkActionStatus::Ready || self.started.swap(true, Ordering::SeqCst) {
            return Err(BulkActionError::InvalidState {
                expected: BulkActionStatus::Ready,
                actual: status,
            });
        }

        let Some(this) = self.self_ref.upgrade() else {
            return Err(BulkActionError::Execution("Bulk action dropped".into()));
        };

        self.report.open();
        tokio::spawn(async move { this.run().await });

        tracing::info!(bulk_action_id = %self.id, "Bulk action started");
        Ok(self.overview())
    }

    /// Background body of [`start`](Self::start). Never fails: every
    /// error becomes the action's `error` and drives it to `Failed`.
    async fn run(self: Arc<Self>) {
        if let Err(e) = self.execute().await {
            tracing::error!(bulk_action_id = %self.id, error = %e, "Bulk action failed");
            {
                let mut lifecycle = self.lifecycle();
                if !lifecycle.status.is_terminal() {
                    lifecycle.error = Some(e.to_string());
                }
            }
            self.set_status(BulkActionStatus::Failed);
        }

        self.report.finalize(|| self.overview());
    }

    async fn execute(&self) -> Result<(), BulkActionError> {
        self.report.wait_for_stream_if_needed().await?;

        self.set_status(BulkActionStatus::Running);
        if self.status() != BulkActionStatus::Running {
            // Aborted before execution began.
            return Ok(());
        }

        // Workers run as separate tasks: when one fails, the rest keep
        // going to completion in the background.
        let tasks = self
            .workers()
            .into_iter()
            .map(|worker| tokio::spawn(async move { worker.run().await }));

        try_join_all(tasks.map(|task| async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(BulkActionError::Execution(format!("worker task failed: {e}"))),
            }
        }))
        .await?;

        self.set_status(BulkActionStatus::Completed);
        Ok(())
    }

    /// Abort the action: terminal `Aborted` status, and any pending report
    /// rendezvous is abandoned. Workers stop at their next check.
    pub fn abort(&self) {
        self.set_status(BulkActionStatus::Aborted);
        self.report.abort();
    }

    // ---- status ----

    /// The only status mutation entry point. Ignored once terminal.
    pub fn set_status(&self, next: BulkActionStatus) {
        let _ = self.change_status(None, next);
    }

    /// Check the current status and move on atomically.
    fn transition_from(
        &self,
        expected: BulkActionStatus,
        next: BulkActionStatus,
    ) -> Result<(), BulkActionError> {
        self.change_status(Some(expected), next)
    }

    fn change_status(
        &self,
        expected: Option<BulkActionStatus>,
        next: BulkActionStatus,
    ) -> Result<(), BulkActionError> {
        let effects = {
            let mut lifecycle = self.lifecycle();
            if let Some(expected) = expected.filter(|&e| e != lifecycle.status) {
                return Err(BulkActionError::InvalidState {
                    expected,
                    actual: lifecycle.status,
                });
            }
            let Some(transition) = lifecycle.status.transition(next) else {
                return Ok(());
            };
            lifecycle.status = transition.status;
            if transition.effects.contains(&StatusEffect::SetEndTime) && lifecycle.end_time.is_none()
            {
                lifecycle.end_time = Some(Utc::now());
            }
            transition.effects
        };

        tracing::debug!(bulk_action_id = %self.id, status = %next, "Bulk action status changed");

        for effect in effects {
            match effect {
                StatusEffect::SetEndTime => {}
                StatusEffect::EnqueueNotification => self.debouncer.enqueue(),
                // A timer that already took the ticket may still be about to
                // publish; the terminal overview must be out before returning.
                StatusEffect::FlushNotification => {
                    if !self.debouncer.flush() {
                        self.send_overview();
                    }
                }
            }
        }
        Ok(())
    }

    // ---- reads ----

    /// Fresh aggregation over every worker. Safe to call at any time.
    pub fn overview(&self) -> BulkActionOverview {
        let (status, end_time, error) = {
            let lifecycle = self.lifecycle();
            (lifecycle.status, lifecycle.end_time, lifecycle.error.clone())
        };
        let workers = self.workers();

        BulkActionOverview {
            id: self.id.clone(),
            database_id: self.database_id.clone(),
            action_type: self.action_type,
            duration: overview::duration_ms(self.start_time, end_time, Utc::now()),
            status,
            filter: self.filter.overview(),
            progress: ProgressOverview::sum(workers.iter().map(|w| w.progress())),
            summary: SummaryOverview::aggregate(workers.iter().map(|w| w.summary())),
            download_url: self.download_url(),
            error,
        }
    }

    // ---- report ----

    pub fn set_streaming_response(&self, sink: Box<dyn ReportSink>) {
        self.report.set_streaming_response(sink);
    }

    pub fn write_to_report(&self, key: &str, error: Option<&str>) {
        self.report.write_to_report(key, error);
    }

    // ---- notifications ----

    /// Schedule a debounced overview notification.
    pub fn notify_changed(&self) {
        self.debouncer.enqueue();
    }

    /// Debounced callback: report a terminal outcome (once) and publish
    /// the overview on the bus.
    fn send_overview(&self) {
        let overview = self.overview();

        if overview.status.is_terminal() && !self.outcome_reported.swap(true, Ordering::SeqCst) {
            match overview.status {
                BulkActionStatus::Completed => self.analytics.completed(&overview),
                BulkActionStatus::Failed => self
                    .analytics
                    .failed(&overview, overview.error.as_deref().unwrap_or_default()),
                BulkActionStatus::Aborted => self.analytics.stopped(&overview),
                _ => {}
            }
        }

        self.bus.publish(BulkActionEvent::overview(&overview));
    }
}
