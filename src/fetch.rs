//! Single-URL fetch operation
//!
//! Drives one [`FetchRequest`] through the transport under the retry policy:
//!
//! ```text
//! Pending -> InFlight -> Success
//!               |
//!               +-> Retrying -> InFlight ...
//!               +-> Failed
//! ```
//!
//! A limiter slot is held only for the transport exchange itself. It is released
//! before the body is parsed and before any backoff sleep, so the limiter counts
//! active network exchanges only.

use crate::error::FetchError;
use crate::limiter::ConcurrencyLimiter;
use crate::retry::{IsRetryable, RetryDecision, RetryPolicy};
use crate::transport::{Transport, TransportResponse};
use crate::types::{AttemptOutcome, Event, FetchRequest, FetchResult, millis};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a fetch operation needs, shared by all operations of a run
#[derive(Clone)]
pub struct FetchContext {
    /// Transport performing the exchanges
    pub transport: Arc<dyn Transport>,
    /// Run-wide concurrency limiter
    pub limiter: ConcurrencyLimiter,
    /// Retry policy
    pub policy: RetryPolicy,
    /// Per-attempt timeout passed to the transport
    pub timeout: Duration,
    /// Event channel for retry notifications
    pub events: broadcast::Sender<Event>,
    /// Run-level cancellation
    pub cancel: CancellationToken,
}

/// Fetch one URL until it succeeds or its retry budget runs out
///
/// Returns `None` only when the run was cancelled before the URL reached a
/// terminal outcome. `elapsed` in the result is measured from the moment the
/// operation started waiting for its first slot.
pub async fn fetch_one(ctx: &FetchContext, request: FetchRequest) -> Option<FetchResult> {
    let start = Instant::now();
    let url = request.url;
    let mut attempt: u32 = 0;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return None,
            outcome = attempt_once(ctx, &url) => outcome?,
        };

        let error = match outcome {
            AttemptOutcome::Success(content) => {
                if attempt > 0 {
                    tracing::debug!(
                        url = %url,
                        attempts = attempt + 1,
                        "Fetch succeeded after retry"
                    );
                }
                return Some(FetchResult::succeeded(url, content, start.elapsed()));
            }
            AttemptOutcome::TerminalFailure(error) => {
                return Some(FetchResult::failed(url, error, start.elapsed()));
            }
            AttemptOutcome::RetryableFailure(error) => error,
        };

        match ctx.policy.decide(attempt, &error) {
            RetryDecision::Stop => {
                tracing::debug!(
                    url = %url,
                    error = %error,
                    kind = error.kind(),
                    attempts = attempt + 1,
                    "Fetch failed after all retry attempts exhausted"
                );
                return Some(FetchResult::failed(url, error, start.elapsed()));
            }
            RetryDecision::Retry(delay) => {
                tracing::warn!(
                    url = %url,
                    error = %error,
                    kind = error.kind(),
                    attempt = attempt,
                    max_retries = ctx.policy.max_retries(),
                    delay_ms = millis(delay),
                    "Fetch attempt failed, retrying"
                );
                let _ = ctx.events.send(Event::Retrying {
                    url: url.clone(),
                    attempt,
                    delay_ms: millis(delay),
                    reason: error.to_string(),
                });

                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => return None,
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}

/// Acquire a slot, run one exchange, release the slot, classify the outcome
///
/// Returns `None` when the limiter was closed while waiting.
async fn attempt_once(ctx: &FetchContext, url: &str) -> Option<AttemptOutcome> {
    let slot = ctx.limiter.acquire().await?;
    let response = ctx.transport.get(url, ctx.timeout).await;
    drop(slot);
    Some(classify_response(response))
}

/// Turn a transport result into an attempt outcome
///
/// Only a 200 response whose body parses as JSON is a success.
pub fn classify_response(response: Result<TransportResponse, FetchError>) -> AttemptOutcome {
    let error = match response {
        Ok(TransportResponse { status: 200, body }) => {
            match serde_json::from_slice::<serde_json::Value>(&body) {
                Ok(content) => return AttemptOutcome::Success(content),
                Err(e) => FetchError::from(e),
            }
        }
        Ok(TransportResponse { status, .. }) => FetchError::Status(status),
        Err(error) => error,
    };

    if error.is_retryable() {
        AttemptOutcome::RetryableFailure(error)
    } else {
        AttemptOutcome::TerminalFailure(error)
    }
}
