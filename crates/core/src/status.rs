//! Bulk action status, job kind, and the status transition function.
//!
//! The coordinator never mutates its status directly: it asks
//! [`BulkActionStatus::transition`] for the next state and applies the
//! returned [`StatusEffect`]s. Once a terminal status is reached the
//! function refuses every further transition.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Job kind
// ---------------------------------------------------------------------------

/// The operation a bulk action performs on every primary node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkActionType {
    /// Delete every key matching the filter.
    Delete,
    /// Execute a list of raw Redis commands.
    Upload,
}

impl BulkActionType {
    /// Wire name of the job kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for BulkActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a bulk action.
///
/// `Initialized -> Preparing -> Ready -> Running -> {Completed | Failed | Aborted}`.
/// `Disconnected` is only ever observed by clients that lost the push
/// channel; the engine never sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkActionStatus {
    Initialized,
    Preparing,
    Ready,
    Running,
    Completed,
    Failed,
    Aborted,
    Disconnected,
}

impl BulkActionStatus {
    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Disconnected => "disconnected",
        }
    }

    /// Terminal statuses accept no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }

    /// Compute the transition from `self` to `next`.
    ///
    /// Returns `None` when `self` is terminal: the request is ignored and
    /// nothing must change. Otherwise the returned [`Transition`] lists
    /// the side effects the caller has to apply, in order.
    pub fn transition(self, next: BulkActionStatus) -> Option<Transition> {
        if self.is_terminal() {
            return None;
        }

        let effects = if next.is_terminal() {
            vec![
                StatusEffect::SetEndTime,
                StatusEffect::EnqueueNotification,
                StatusEffect::FlushNotification,
            ]
        } else {
            vec![StatusEffect::EnqueueNotification]
        };

        Some(Transition {
            status: next,
            effects,
        })
    }
}

impl fmt::Display for BulkActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transition
// ---------------------------------------------------------------------------

/// A side effect the coordinator must apply after changing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEffect {
    /// Record the end time, unless it is already set.
    SetEndTime,
    /// Schedule a debounced overview notification.
    EnqueueNotification,
    /// Deliver the pending notification synchronously.
    FlushNotification,
}

/// Result of an accepted status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: BulkActionStatus,
    pub effects: Vec<StatusEffect>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
