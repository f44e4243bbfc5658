//! Outcome reporting for finished bulk actions.

use rebulk_core::overview::BulkActionOverview;

/// Receives the terminal outcome of each bulk action.
pub trait BulkActionAnalytics: Send + Sync {
    fn completed(&self, overview: &BulkActionOverview);

    fn failed(&self, overview: &BulkActionOverview, error: &str);

    fn stopped(&self, overview: &BulkActionOverview);
}

/// Emits outcomes as structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAnalytics;

impl BulkActionAnalytics for TracingAnalytics {
    fn completed(&self, overview: &BulkActionOverview) {
        tracing::info!(
            bulk_action_id = %overview.id,
            action_type = %overview.action_type,
            duration_ms = overview.duration,
            processed = overview.summary.processed,
            succeed = overview.summary.succeed,
            failed = overview.summary.failed,
            "Bulk action completed",
        );
    }

    fn failed(&self, overview: &BulkActionOverview, error: &str) {
        tracing::warn!(
            bulk_action_id = %overview.id,
            action_type = %overview.action_type,
            duration_ms = overview.duration,
            error,
            "Bulk action failed",
        );
    }

    fn stopped(&self, overview: &BulkActionOverview) {
        tracing::info!(
            bulk_action_id = %overview.id,
            action_type = %overview.action_type,
            duration_ms = overview.duration,
            processed = overview.summary.processed,
            "Bulk action stopped",
        );
    }
}
