//! Concurrency limiting for transport exchanges
//!
//! The ConcurrencyLimiter caps how many fetch operations may be inside a
//! transport exchange at once. It is shared by every fetch task of a run.
//!
//! Slots are granted in FIFO order (tokio's semaphore is fair), so no URL can be
//! starved while others keep re-acquiring.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting limiter shared across all fetch tasks of a run
///
/// Cloning is cheap and every clone refers to the same slot pool.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One occupied slot; dropping it returns the slot to the limiter
#[must_use = "the slot is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` slots
    ///
    /// # Examples
    ///
    /// ```
    /// use url_fetcher::limiter::ConcurrencyLimiter;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let limiter = ConcurrencyLimiter::new(2);
    ///
    /// let slot = limiter.acquire().await.unwrap();
    /// assert_eq!(limiter.in_flight(), 1);
    /// drop(slot);
    /// assert_eq!(limiter.in_flight(), 0);
    /// # }
    /// ```
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait until a slot is free and take it
    ///
    /// Returns `None` once the limiter has been closed.
    pub async fn acquire(&self) -> Option<SlotGuard> {
        match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => Some(SlotGuard { _permit: permit }),
            Err(_) => None,
        }
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| SlotGuard { _permit: permit })
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.semaphore.available_permits())
    }

    /// Refuse further acquisitions and wake every waiter with `None`
    ///
    /// Slots already held stay valid until their guards drop.
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether [`close`](Self::close) has been called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}
