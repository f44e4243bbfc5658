use std::time::Duration;

/// How long a report-enabled action waits for its stream to attach.
pub const DEFAULT_REPORT_WAIT: Duration = Duration::from_millis(5000);

/// Debounce window (and max wait) for overview notifications.
pub const DEFAULT_NOTIFY_WINDOW: Duration = Duration::from_millis(1000);

/// Timing knobs of a bulk action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkActionSettings {
    pub report_wait: Duration,
    pub notify_window: Duration,
}

impl Default for BulkActionSettings {
    fn default() -> Self {
        Self {
            report_wait: DEFAULT_REPORT_WAIT,
            notify_window: DEFAULT_NOTIFY_WINDOW,
        }
    }
}
