//! Run statistics
//!
//! The aggregator is incremented exactly once per terminal result. `total` is
//! fixed when the run starts, so `successful + failed <= total` holds during the
//! run and `successful + failed == total` once every URL has finished.

use crate::types::FetchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Outcome counts of one fetch run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Number of URLs in the run
    pub total: usize,
    /// URLs that produced valid content
    pub successful: usize,
    /// URLs that failed after exhausting their retries
    pub failed: usize,
    /// Wall-clock time from run start to the last result (seconds when serialized)
    #[serde(with = "duration_secs_serde")]
    pub total_time: Duration,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Whether the run was cancelled before every URL finished
    #[serde(default)]
    pub cancelled: bool,
}

impl RunStatistics {
    /// Statistics of a run with no URLs
    pub fn empty() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            total_time: Duration::ZERO,
            started_at: Utc::now(),
            cancelled: false,
        }
    }

    /// `successful / total`, or `None` for an empty run
    pub fn success_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.successful as f64 / self.total as f64)
        }
    }

    /// Average wall-clock time per URL, or `None` for an empty run
    pub fn average_time_per_url(&self) -> Option<Duration> {
        u32::try_from(self.total)
            .ok()
            .filter(|total| *total > 0)
            .map(|total| self.total_time / total)
    }

    /// Whether every URL reached a terminal result
    pub fn is_complete(&self) -> bool {
        self.successful + self.failed == self.total
    }

    /// Log the run summary at info level
    pub fn log_summary(&self, output: &Path) {
        tracing::info!(
            total = self.total,
            successful = self.successful,
            failed = self.failed,
            success_rate_pct = self.success_rate().map(|r| r * 100.0).unwrap_or(0.0),
            total_time_secs = self.total_time.as_secs_f64(),
            avg_time_per_url_secs = self
                .average_time_per_url()
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0),
            cancelled = self.cancelled,
            output = %output.display(),
            "Processing complete"
        );
    }
}

/// Thread-safe accumulator for [`RunStatistics`]
#[derive(Debug)]
pub struct StatisticsAggregator {
    total: usize,
    successful: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl StatisticsAggregator {
    /// Start the clock for a run of `total` URLs
    pub fn new(total: usize) -> Self {
        Self {
            total,
            successful: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Count one terminal result
    pub fn record(&self, result: &FetchResult) {
        if result.success {
            self.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current counts; `total_time` is the time elapsed so far
    pub fn snapshot(&self) -> RunStatistics {
        RunStatistics {
            total: self.total,
            successful: self.successful.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total_time: self.started.elapsed(),
            started_at: self.started_at,
            cancelled: false,
        }
    }

    /// Final statistics, taken after the last result was recorded
    pub fn finish(self, cancelled: bool) -> RunStatistics {
        RunStatistics {
            cancelled,
            ..self.snapshot()
        }
    }
}

mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_counts_successes_and_failures() {
        let aggregator = StatisticsAggregator::new(3);
        aggregator.record(&FetchResult::succeeded("a", json!(1), Duration::ZERO));
        aggregator.record(&FetchResult::failed("b", FetchError::Timeout, Duration::ZERO));

        let partial = aggregator.snapshot();
        assert_eq!(partial.total, 3);
        assert!(partial.successful + partial.failed <= partial.total);
        assert!(!partial.is_complete());

        aggregator.record(&FetchResult::succeeded("c", json!(2), Duration::ZERO));
        let stats = aggregator.finish(false);
        assert_eq!((stats.total, stats.successful, stats.failed), (3, 2, 1));
        assert!(stats.is_complete());
        assert!(!stats.cancelled);
    }

    #[test]
    fn test_success_rate_and_average() {
        let stats = RunStatistics {
            total: 4,
            successful: 3,
            failed: 1,
            total_time: Duration::from_secs(8),
            started_at: Utc::now(),
            cancelled: false,
        };
        assert_eq!(stats.success_rate(), Some(0.75));
        assert_eq!(stats.average_time_per_url(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_empty_run_has_no_rates() {
        let stats = RunStatistics::empty();
        assert_eq!(stats.success_rate(), None);
        assert_eq!(stats.average_time_per_url(), None);
        assert!(stats.is_complete());
    }

    #[test]
    fn test_serializes_total_time_as_seconds() {
        let stats = RunStatistics {
            total_time: Duration::from_millis(1500),
            ..RunStatistics::empty()
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(value["total_time"], json!(1.5));

        let back: RunStatistics = serde_json::from_value(value).unwrap();
        assert_eq!(back, stats);
    }

    #[tokio::test]
    async fn test_concurrent_recording() {
        let aggregator = Arc::new(StatisticsAggregator::new(100));
        let mut handles = Vec::new();
        for i in 0..100 {
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                let result = if i % 4 == 0 {
                    FetchResult::failed(format!("u{i}"), FetchError::Status(500), Duration::ZERO)
                } else {
                    FetchResult::succeeded(format!("u{i}"), json!(i), Duration::ZERO)
                };
                aggregator.record(&result);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = aggregator.snapshot();
        assert_eq!(stats.successful, 75);
        assert_eq!(stats.failed, 25);
        assert!(stats.is_complete());
    }
}
