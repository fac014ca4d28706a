//! # url-fetcher
//!
//! Fetches a list of URLs over HTTP with a bounded number of simultaneous
//! requests, retries transient failures with linear backoff, and streams every
//! JSON payload to a newline-delimited JSON file as soon as it arrives.
//!
//! ## Behavior
//!
//! - **Bounded concurrency** - at most `max_concurrent` exchanges are on the wire
//! - **Retry everything transient** - timeouts, connection errors, non-200
//!   statuses and malformed JSON are retried up to `max_retries` times
//! - **Streaming output** - results are written in completion order, one line
//!   per success, each line durable before the next result is handled
//! - **Partial failure** - a failing URL is counted, logged and skipped; it
//!   never aborts the run
//!
//! ## Quick Start
//!
//! ```no_run
//! use url_fetcher::{Config, UrlFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = UrlFetcher::new(Config::default())?;
//!
//!     let urls = vec![
//!         "https://httpbin.org/json".to_string(),
//!         "https://httpbin.org/status/500".to_string(),
//!     ];
//!     let stats = fetcher.fetch_urls(urls, "result.jsonl").await?;
//!
//!     println!(
//!         "{} of {} succeeded in {:.2?}",
//!         stats.successful, stats.total, stats.total_time
//!     );
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Single-URL fetch operation
pub mod fetch;
/// Run orchestration
pub mod fetcher;
/// URL list input
pub mod input;
/// Concurrency limiting
pub mod limiter;
/// Retry policy with linear backoff
pub mod retry;
/// Run statistics
pub mod stats;
/// HTTP transport seam
pub mod transport;
/// Core types and events
pub mod types;
/// Streaming output sink
pub mod writer;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, RetryConfig};
pub use error::{Error, FetchError, Result};
pub use fetcher::{UrlFetcher, fetch_urls_from_file};
pub use limiter::ConcurrencyLimiter;
pub use retry::{RetryDecision, RetryPolicy};
pub use stats::RunStatistics;
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{AttemptOutcome, Event, FetchRequest, FetchResult};
pub use writer::{JsonlWriter, ResultSink};

use tokio_util::sync::CancellationToken;

/// Cancellation token that fires on the first termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to Ctrl+C if registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// Pass the token to [`UrlFetcher::fetch_urls_with_cancel`] so an interrupted
/// run still returns statistics for the URLs that completed.
///
/// # Example
///
/// ```no_run
/// use url_fetcher::{Config, UrlFetcher, shutdown_token};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let fetcher = UrlFetcher::new(Config::default())?;
///     let urls = vec!["https://httpbin.org/json".to_string()];
///
///     let stats = fetcher
///         .fetch_urls_with_cancel(urls, "result.jsonl", shutdown_token())
///         .await?;
///     if stats.cancelled {
///         eprintln!("interrupted after {} results", stats.successful + stats.failed);
///     }
///     Ok(())
/// }
/// ```
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => trigger.cancel(),
            _ = trigger.cancelled() => {}
        }
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        // Registration may fail in restricted environments (containers, tests)
        (sigterm, sigint) => {
            tracing::warn!(
                sigterm_registered = sigterm.is_ok(),
                sigint_registered = sigint.is_ok(),
                "Could not register signal handlers, using ctrl_c fallback"
            );
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received Ctrl+C signal");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
