//! Counters owned by a single node worker.
//!
//! Each counter is updated atomically, so a snapshot never observes half
//! of an update to one counter. Different counters may be slightly out of
//! phase with each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use rebulk_core::progress::{KeyError, ProgressOverview, SummaryOverview};

/// Maximum number of per-key errors retained by one worker.
pub const MAX_WORKER_ERRORS: usize = 500;

/// Maximum number of processed key names retained by one worker.
pub const MAX_WORKER_KEYS: usize = 500;

/// Scan progress of one worker.
#[derive(Debug, Default)]
pub struct WorkerProgress {
    total: AtomicU64,
    scanned: AtomicU64,
}

impl WorkerProgress {
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Add to the scanned count without exceeding the known total.
    pub fn add_scanned(&self, n: u64) {
        let total = self.total.load(Ordering::Relaxed);
        let _ = self
            .scanned
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |s| {
                Some(s.saturating_add(n).min(total.max(s)))
            });
    }

    /// Mark the scan as complete.
    pub fn finish(&self) {
        let total = self.total.load(Ordering::Relaxed);
        self.scanned.fetch_max(total, Ordering::Relaxed);
    }

    pub fn overview(&self) -> ProgressOverview {
        ProgressOverview {
            total: self.total.load(Ordering::Relaxed),
            scanned: self.scanned.load(Ordering::Relaxed),
        }
    }
}

/// Outcome counters of one worker.
#[derive(Debug, Default)]
pub struct WorkerSummary {
    processed: AtomicU64,
    succeed: AtomicU64,
    failed: AtomicU64,
    errors: Mutex<Vec<KeyError>>,
    keys: Mutex<Vec<Vec<u8>>>,
}

impl WorkerSummary {
    pub fn add_success(&self, key: &[u8]) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.succeed.fetch_add(1, Ordering::Relaxed);
        let mut keys = self.keys.lock().unwrap_or_else(|e| e.into_inner());
        if keys.len() < MAX_WORKER_KEYS {
            keys.push(key.to_vec());
        }
    }

    pub fn add_failure(&self, key: &[u8], error: impl Into<String>) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
        let mut errors = self.errors.lock().unwrap_or_else(|e| e.into_inner());
        if errors.len() < MAX_WORKER_ERRORS {
            errors.push(KeyError {
                key: String::from_utf8_lossy(key).into_owned(),
                error: error.into(),
            });
        }
    }

    /// Snapshot with key buffers converted to strings.
    pub fn overview(&self) -> SummaryOverview {
        let errors = self
            .errors
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let keys = self
            .keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|k| String::from_utf8_lossy(k).into_owned())
            .collect();

        SummaryOverview {
            processed: self.processed.load(Ordering::Relaxed),
            succeed: self.succeed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            errors,
            keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanned_never_exceeds_total() {
        let progress = WorkerProgress::default();
        progress.set_total(25);
        progress.add_scanned(10);
        progress.add_scanned(10);
        progress.add_scanned(10);
        assert_eq!(progress.overview().scanned, 25);
    }

    #[test]
    fn finish_marks_everything_scanned() {
        let progress = WorkerProgress::default();
        progress.set_total(7);
        progress.add_scanned(2);
        progress.finish();
        assert_eq!(
            progress.overview(),
            ProgressOverview {
                total: 7,
                scanned: 7
            }
        );
    }

    #[test]
    fn summary_counts_and_stringifies() {
        let summary = WorkerSummary::default();
        summary.add_success(b"a");
        summary.add_success(&[0x66, 0x6f, 0xff]);
        summary.add_failure(b"b", "NOPERM");

        let overview = summary.overview();
        assert_eq!(overview.processed, 3);
        assert_eq!(overview.succeed, 2);
        assert_eq!(overview.failed, 1);
        assert_eq!(overview.keys, vec!["a".to_string(), "fo\u{fffd}".to_string()]);
        assert_eq!(overview.errors[0].key, "b");
        assert_eq!(overview.errors[0].error, "NOPERM");
    }

    #[test]
    fn worker_errors_are_bounded() {
        let summary = WorkerSummary::default();
        for i in 0..(MAX_WORKER_ERRORS + 20) {
            summary.add_failure(format!("k{i}").as_bytes(), "err");
        }
        let overview = summary.overview();
        assert_eq!(overview.failed as usize, MAX_WORKER_ERRORS + 20);
        assert_eq!(overview.errors.len(), MAX_WORKER_ERRORS);
    }
}
