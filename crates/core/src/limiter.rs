//! Counting permit pool bounding concurrent fetch jobs.
//!
//! Built on [`tokio::sync::Semaphore`]: waiters are woken in FIFO order and
//! a released permit is handed to the next waiter without polling.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::metrics;

/// Default number of concurrent fetch jobs.
pub const DEFAULT_CAPACITY: usize = 3;

/// The limiter was closed and hands out no more permits.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("concurrency limiter is closed")]
pub struct LimiterClosed;

/// A fixed-capacity pool of permits.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of capacity, held for the duration of a job.
///
/// The permit returns to the pool when dropped, so it is released on every
/// exit path, including task cancellation. [`Permit::release`] consumes the
/// permit, which makes releasing twice impossible.
#[derive(Debug)]
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    _inner: OwnedSemaphorePermit,
}

impl Permit {
    fn new(inner: OwnedSemaphorePermit) -> Self {
        metrics::PERMITS_IN_USE.inc();
        Self { _inner: inner }
    }

    /// Returns the permit to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        metrics::PERMITS_IN_USE.dec();
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ConcurrencyLimiter {
    /// Creates a limiter. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits for a permit.
    ///
    /// Only fails once [`close`](Self::close) has been called.
    pub async fn acquire(&self) -> Result<Permit, LimiterClosed> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map(Permit::new)
            .map_err(|_| LimiterClosed)
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire(&self) -> Result<Option<Permit>, LimiterClosed> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(Some(Permit::new(permit))),
            Err(TryAcquireError::NoPermits) => Ok(None),
            Err(TryAcquireError::Closed) => Err(LimiterClosed),
        }
    }

    /// Stops handing out permits. Pending and future `acquire` calls fail;
    /// permits already held stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_capacity_is_raised() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.capacity(), 1);
        assert_eq!(ConcurrencyLimiter::default().capacity(), 3);
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let limiter = ConcurrencyLimiter::new(2);

        let a = limiter.acquire().await.unwrap();
        let b = limiter.acquire().await.unwrap();
        assert_eq!(limiter.in_use(), 2);
        assert!(limiter.try_acquire().unwrap().is_none());

        a.release();
        assert_eq!(limiter.in_use(), 1);
        drop(b);
        assert_eq!(limiter.available(), 2);
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_release() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.acquire().await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        held.release();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap()
            .unwrap();
        assert_eq!(limiter.in_use(), 0);
    }

    #[test]
    fn test_waiter_is_pending_until_release() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = tokio_test::block_on(limiter.acquire()).unwrap();

        let mut waiter = tokio_test::task::spawn(limiter.acquire());
        tokio_test::assert_pending!(waiter.poll());

        held.release();
        assert!(waiter.is_woken());
        let permit = tokio_test::assert_ready_ok!(waiter.poll());
        assert_eq!(limiter.in_use(), 1);
        drop(permit);
        assert_eq!(limiter.in_use(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_and_holder_release() {
        let limiter = ConcurrencyLimiter::new(1);

        let holder = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_secs(60)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(limiter.in_use(), 1);

        holder.abort();
        let _ = holder.await;
        assert_eq!(limiter.in_use(), 0);
    }

    #[tokio::test]
    async fn test_close_rejects_new_acquires() {
        let limiter = ConcurrencyLimiter::new(1);
        let held = limiter.acquire().await.unwrap();

        limiter.close();
        assert!(limiter.is_closed());
        assert_eq!(limiter.acquire().await.unwrap_err(), LimiterClosed);
        assert!(limiter.try_acquire().is_err());

        drop(held);
    }
}
