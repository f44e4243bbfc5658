//! Point-in-time read model of a bulk action.
//!
//! Overviews are derived on every request and never stored. They are the
//! payload of the `overview` push event and of the REST endpoints.

use serde::{Deserialize, Serialize};

use crate::filter::FilterOverview;
use crate::progress::{ProgressOverview, SummaryOverview};
use crate::status::{BulkActionStatus, BulkActionType};
use crate::types::{BulkActionId, DatabaseId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkActionOverview {
    pub id: BulkActionId,
    pub database_id: DatabaseId,
    #[serde(rename = "type")]
    pub action_type: BulkActionType,
    /// Milliseconds between start and end (or now, while unfinished).
    pub duration: i64,
    pub status: BulkActionStatus,
    pub filter: FilterOverview,
    pub progress: ProgressOverview,
    pub summary: SummaryOverview,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Relative URL of the report download endpoint for a bulk action.
pub fn download_url(database_id: &str, id: &str) -> String {
    format!("databases/{database_id}/bulk-actions/{id}/report/download")
}

/// Duration in milliseconds between `start` and `end`, or `now` when the
/// action has not finished yet. Never negative.
pub fn duration_ms(start: Timestamp, end: Option<Timestamp>, now: Timestamp) -> i64 {
    let until = end.unwrap_or(now);
    (until - start).num_milliseconds().max(0)
}
