//! Progress and summary snapshots and their aggregation across workers.

use serde::{Deserialize, Serialize};

/// Maximum number of per-key errors exposed in an aggregated summary.
pub const MAX_AGGREGATED_ERRORS: usize = 500;

/// Scan progress of one worker, or the sum over all workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressOverview {
    pub total: u64,
    pub scanned: u64,
}

impl ProgressOverview {
    /// Pointwise sum of worker snapshots.
    pub fn sum<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = ProgressOverview>,
    {
        parts.into_iter().fold(Self::default(), |acc, p| Self {
            total: acc.total + p.total,
            scanned: acc.scanned + p.scanned,
        })
    }
}

/// A single key that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyError {
    pub key: String,
    pub error: String,
}

/// Outcome counters of one worker, or the aggregate over all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryOverview {
    pub processed: u64,
    pub succeed: u64,
    pub failed: u64,
    pub errors: Vec<KeyError>,
    pub keys: Vec<String>,
}

impl SummaryOverview {
    /// Pointwise sum of worker snapshots.
    ///
    /// Errors and keys are concatenated in worker order; the error list is
    /// then truncated to [`MAX_AGGREGATED_ERRORS`].
    pub fn aggregate<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = SummaryOverview>,
    {
        let mut acc = parts.into_iter().fold(Self::default(), |mut acc, part| {
            acc.processed += part.processed;
            acc.succeed += part.succeed;
            acc.failed += part.failed;
            acc.errors.extend(part.errors);
            acc.keys.extend(part.keys);
            acc
        });
        acc.errors.truncate(MAX_AGGREGATED_ERRORS);
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(processed: u64, succeed: u64, failed: u64, errors: usize) -> SummaryOverview {
        SummaryOverview {
            processed,
            succeed,
            failed,
            errors: (0..errors)
                .map(|i| KeyError {
                    key: format!("key:{i}"),
                    error: "WRONGTYPE".into(),
                })
                .collect(),
            keys: Vec::new(),
        }
    }

    #[test]
    fn progress_is_pointwise_sum() {
        let total = ProgressOverview::sum([
            ProgressOverview {
                total: 100,
                scanned: 40,
            },
            ProgressOverview {
                total: 50,
                scanned: 50,
            },
        ]);
        assert_eq!(
            total,
            ProgressOverview {
                total: 150,
                scanned: 90
            }
        );
    }

    #[test]
    fn summary_sums_two_workers() {
        let agg = SummaryOverview::aggregate([summary(10, 9, 1, 1), summary(5, 5, 0, 0)]);
        assert_eq!(agg.processed, 15);
        assert_eq!(agg.succeed, 14);
        assert_eq!(agg.failed, 1);
        assert_eq!(agg.errors.len(), 1);
    }

    #[test]
    fn aggregated_errors_are_capped() {
        let agg = SummaryOverview::aggregate([summary(400, 0, 400, 400), summary(300, 0, 300, 300)]);
        assert_eq!(agg.failed, 700);
        assert_eq!(agg.errors.len(), MAX_AGGREGATED_ERRORS);
        assert_eq!(agg.errors[0].key, "key:0");
    }

    #[test]
    fn empty_aggregation_is_zero() {
        assert_eq!(SummaryOverview::aggregate(Vec::new()), SummaryOverview::default());
        assert_eq!(ProgressOverview::sum(Vec::new()), ProgressOverview::default());
    }
}
