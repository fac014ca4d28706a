//! Retry policy with linear backoff
//!
//! The policy is a pure decision function: given the index of the attempt that
//! just failed and the error it failed with, it answers either
//! [`RetryDecision::Retry`] with the wait before the next attempt, or
//! [`RetryDecision::Stop`].
//!
//! # Example
//!
//! ```
//! use url_fetcher::config::RetryConfig;
//! use url_fetcher::error::FetchError;
//! use url_fetcher::retry::{RetryDecision, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::from_config(&RetryConfig::default());
//!
//! assert_eq!(
//!     policy.decide(0, &FetchError::Timeout),
//!     RetryDecision::Retry(Duration::from_secs(1))
//! );
//! assert_eq!(
//!     policy.decide(1, &FetchError::Status(500)),
//!     RetryDecision::Retry(Duration::from_secs(2))
//! );
//! assert_eq!(policy.decide(2, &FetchError::Timeout), RetryDecision::Stop);
//! ```

use crate::config::RetryConfig;
use crate::error::FetchError;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Every fetch failure is treated as transient: the URL is retried until its
/// budget runs out and then reported as failed.
impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout
            | FetchError::Connection(_)
            | FetchError::Status(_)
            | FetchError::InvalidContent(_)
            | FetchError::Unexpected(_) => true,
        }
    }
}

/// Decision taken after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given delay, then attempt again
    Retry(Duration),
    /// Give up; the last error becomes the terminal failure
    Stop,
}

/// Linear backoff retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    jitter: bool,
}

impl RetryPolicy {
    /// Create a policy from explicit values (no jitter)
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            jitter: false,
        }
    }

    /// Create a policy from the retry section of the configuration
    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            jitter: config.jitter,
        }
    }

    /// Retries allowed after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on transport exchanges per URL
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Decide what happens after attempt `attempt` (0-based) failed with `error`
    pub fn decide<E: IsRetryable>(&self, attempt: u32, error: &E) -> RetryDecision {
        if error.is_retryable() && attempt < self.max_retries {
            RetryDecision::Retry(self.backoff_delay(attempt))
        } else {
            RetryDecision::Stop
        }
    }

    /// Wait before the attempt following `attempt`: `base_delay * (attempt + 1)`
    ///
    /// With jitter enabled a random amount of at most half a `base_delay` is
    /// added, which keeps consecutive delays strictly increasing.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.saturating_mul(attempt.saturating_add(1));
        if self.jitter {
            add_jitter(delay, self.base_delay / 2)
        } else {
            delay
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Add a uniformly distributed amount in `[0, max_extra]` to `delay`
fn add_jitter(delay: Duration, max_extra: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen_range(0.0..=1.0);
    delay + max_extra.mul_f64(factor)
}
