//! Core types for url-fetcher

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;
use crate::stats::RunStatistics;

/// One URL to fetch
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,
}

impl FetchRequest {
    /// Create a new request
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl From<String> for FetchRequest {
    fn from(url: String) -> Self {
        Self { url }
    }
}

impl From<&str> for FetchRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

/// Terminal result of one fetch operation
///
/// Build it with [`FetchResult::succeeded`] or [`FetchResult::failed`] so that
/// `success == content.is_some() == error.is_none()` always holds.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct FetchResult {
    /// URL the result belongs to
    pub url: String,
    /// Whether the URL produced valid content
    pub success: bool,
    /// Parsed JSON payload (present only on success)
    pub content: Option<Value>,
    /// Human-readable failure reason (present only on failure)
    pub error: Option<String>,
    /// Time from the first attempt to the terminal outcome, retries and backoff included
    pub elapsed: Duration,
}

impl FetchResult {
    /// Successful result carrying the parsed payload
    pub fn succeeded(url: impl Into<String>, content: Value, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            success: true,
            content: Some(content),
            error: None,
            elapsed,
        }
    }

    /// Failed result carrying the reason of the last attempt
    pub fn failed(url: impl Into<String>, error: impl ToString, elapsed: Duration) -> Self {
        Self {
            url: url.into(),
            success: false,
            content: None,
            error: Some(error.to_string()),
            elapsed,
        }
    }
}

/// Outcome of a single transport exchange plus the parse step
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// 200 response with valid JSON
    Success(Value),
    /// Transient failure, eligible for another attempt
    RetryableFailure(FetchError),
    /// Failure that must not be retried
    TerminalFailure(FetchError),
}

/// Event emitted during a fetch run
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Run accepted its URL list
    RunStarted {
        /// Number of URLs in the run
        total: usize,
    },

    /// An attempt failed and the URL will be tried again
    Retrying {
        /// URL being retried
        url: String,
        /// Attempt that just failed (0-based)
        attempt: u32,
        /// Wait before the next attempt, in milliseconds
        delay_ms: u64,
        /// Why the attempt failed
        reason: String,
    },

    /// URL produced valid content
    Fetched {
        /// URL that succeeded
        url: String,
        /// Cumulative time for the URL, in milliseconds
        elapsed_ms: u64,
    },

    /// URL failed after exhausting its retries
    Failed {
        /// URL that failed
        url: String,
        /// Reason of the last attempt
        error: String,
        /// Cumulative time for the URL, in milliseconds
        elapsed_ms: u64,
    },

    /// Every URL reached a terminal result, or the run was cancelled
    RunFinished {
        /// Final statistics
        stats: RunStatistics,
    },
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
