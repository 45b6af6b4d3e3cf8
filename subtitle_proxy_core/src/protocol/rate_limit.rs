//! Process-wide rate gate for outbound calls
//!
//! Every outbound request holds a [`RatePermit`] for its whole duration. The
//! gate is a fair mutex, so waiters proceed in arrival order, and the
//! completion time of each call is recorded when its permit is dropped.

use log::{debug, trace};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::sleep;

/// Rate limiter enforcing a minimum spacing between remote calls
pub struct RateLimiter {
    /// Completion time of the previous call
    last_call: Mutex<Option<Instant>>,
    /// Minimum delay between the end of one call and the start of the next
    min_interval: Duration,
}

/// Exclusive right to issue one outbound call
///
/// Dropping the permit records the call as finished.
pub struct RatePermit<'a> {
    guard: MutexGuard<'a, Option<Instant>>,
    waited: Duration,
}

impl RatePermit<'_> {
    /// Time spent waiting for the cooldown before this permit was granted
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for RatePermit<'_> {
    fn drop(&mut self) {
        *self.guard = Some(Instant::now());
        trace!("Rate limiter: recorded call completion");
    }
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a call may be issued and take the gate
    ///
    /// Cancelling this future while it waits leaves the recorded state untouched.
    pub async fn acquire(&self) -> RatePermit<'_> {
        trace!("Rate limiter: acquiring gate...");
        let guard = self.last_call.lock().await;
        let start = Instant::now();

        if let Some(last_time) = *guard {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiter: waiting {wait_time:?} to respect rate limit");
                sleep(wait_time).await;
            } else {
                trace!("Rate limiter: no wait needed, {elapsed:?} since last call");
            }
        } else {
            trace!("Rate limiter: no previous call, proceeding immediately");
        }

        RatePermit {
            guard,
            waited: start.elapsed(),
        }
    }

    /// Completion time of the most recent call
    pub async fn last_call(&self) -> Option<Instant> {
        *self.last_call.lock().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_call_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));

        let start = Instant::now();
        let permit = limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(permit.waited() < Duration::from_millis(100));
        drop(permit);

        assert!(limiter.last_call().await.is_some());
    }

    #[tokio::test]
    async fn test_second_call_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        drop(limiter.acquire().await);

        let start = Instant::now();
        let permit = limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(190));
        assert!(permit.waited() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_are_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move {
                    let _permit = limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut starts = Vec::new();
        for handle in handles {
            starts.push(handle.await.unwrap());
        }
        starts.sort();

        for pair in starts.windows(2) {
            assert!(
                pair[1] - pair[0] >= Duration::from_millis(95),
                "calls spaced by {:?}",
                pair[1] - pair[0]
            );
        }
    }

    #[tokio::test]
    async fn test_cancelled_wait_has_no_side_effects() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        drop(limiter.acquire().await);
        let recorded = limiter.last_call().await;

        let result =
            tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(result.is_err());

        assert_eq!(limiter.last_call().await, recorded);
    }
}
