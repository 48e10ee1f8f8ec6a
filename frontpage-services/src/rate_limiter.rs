//! Shared rate limiter for embedding provider calls
//!
//! Spaces requests by a minimum delay so bulk backfills stay under the
//! provider's rate limit, even when several workers share one limiter.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Rate limiter that enforces minimum delay between requests
///
/// Callers reserve a time slot while holding the lock and wait for it
/// after releasing it, so concurrent callers always get distinct slots
/// spaced `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    /// Next free slot, in milliseconds since `epoch`
    next_slot_ms: Mutex<u64>,
    epoch: Instant,
    min_interval: Duration,
    /// Name for logging purposes
    name: String,
    total_requests: AtomicU64,
    waited_requests: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified minimum interval between requests
    pub fn new(min_interval_ms: u64, name: &str) -> Self {
        Self {
            next_slot_ms: Mutex::new(0), // First request can go immediately
            epoch: Instant::now(),
            min_interval: Duration::from_millis(min_interval_ms),
            name: name.to_string(),
            total_requests: AtomicU64::new(0),
            waited_requests: AtomicU64::new(0),
        }
    }

    fn elapsed_ms(&self) -> u64 {
        Instant::now().duration_since(self.epoch).as_millis() as u64
    }

    /// Reserve the next slot, returning when it opens if it is in the future
    async fn reserve(&self) -> Option<Instant> {
        let request_num = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;
        let now_ms = self.elapsed_ms();
        let interval_ms = self.min_interval.as_millis() as u64;

        let mut next_slot = self.next_slot_ms.lock().await;
        if now_ms >= *next_slot {
            *next_slot = now_ms + interval_ms;
            debug!(
                "[RATE_LIMITER:{}] #{} immediate, next slot at {}ms",
                self.name, request_num, *next_slot
            );
            return None;
        }

        let our_slot = *next_slot;
        *next_slot = our_slot + interval_ms;
        self.waited_requests.fetch_add(1, Ordering::Relaxed);

        debug!(
            "[RATE_LIMITER:{}] #{} queued for {}ms, slot at {}ms",
            self.name,
            request_num,
            our_slot - now_ms,
            our_slot
        );
        Some(self.epoch + Duration::from_millis(our_slot))
    }

    /// Wait for the next free slot, giving up when `cancel` fires
    ///
    /// Returns `false` if cancelled before the slot opened. The reserved slot
    /// is not handed back.
    pub async fn acquire_or_cancel(&self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let Some(slot) = self.reserve().await else {
            return true;
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("[RATE_LIMITER:{}] wait cancelled", self.name);
                false
            }
            _ = tokio::time::sleep_until(slot) => true,
        }
    }

    /// Request counters, logged at the end of a backfill
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            waited_requests: self.waited_requests.load(Ordering::Relaxed),
            min_interval_ms: self.min_interval.as_millis() as u64,
            name: self.name.clone(),
        }
    }
}

/// Statistics about rate limiter usage
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub waited_requests: u64,
    pub min_interval_ms: u64,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::BackfillConfig;

    #[tokio::test]
    async fn test_reserve_hands_out_spaced_slots() {
        let limiter = RateLimiter::new(100, "slots");

        assert!(limiter.reserve().await.is_none());
        let second = limiter.reserve().await.unwrap();
        let third = limiter.reserve().await.unwrap();

        assert_eq!(third - second, Duration::from_millis(100));
        assert!(second > Instant::now());

        let stats = limiter.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.waited_requests, 2);
    }

    #[tokio::test]
    async fn test_slot_reopens_after_interval() {
        let limiter = RateLimiter::new(30, "reopen");

        assert!(limiter.reserve().await.is_none());
        tokio::time::sleep(Duration::from_millis(45)).await;
        assert!(limiter.reserve().await.is_none());
        assert_eq!(limiter.stats().waited_requests, 0);
    }

    #[tokio::test]
    async fn test_zero_interval_never_waits() {
        let limiter = RateLimiter::new(0, "unthrottled");
        let cancel = CancellationToken::new();

        let start = Instant::now();
        for _ in 0..10 {
            assert!(limiter.acquire_or_cancel(&cancel).await);
        }

        assert!(start.elapsed().as_millis() < 20);
        assert_eq!(limiter.stats().waited_requests, 0);
    }

    #[tokio::test]
    async fn test_backfill_delay_spaces_provider_calls() {
        let delay_ms = BackfillConfig::default().delay_ms;
        let limiter = RateLimiter::new(delay_ms, "backfill");
        let cancel = CancellationToken::new();

        assert!(limiter.acquire_or_cancel(&cancel).await);
        let start = Instant::now();
        assert!(limiter.acquire_or_cancel(&cancel).await);
        let waited = start.elapsed();

        assert!(waited.as_millis() >= 90, "second call after {:?}", waited);
        assert!(waited.as_millis() < 150, "second call after {:?}", waited);
    }

    #[tokio::test]
    async fn test_workers_sharing_a_limiter_get_distinct_slots() {
        let limiter = Arc::new(RateLimiter::new(50, "workers"));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    assert!(limiter.acquire_or_cancel(&cancel).await);
                    start.elapsed()
                })
            })
            .collect();

        let mut started = Vec::new();
        for worker in workers {
            started.push(worker.await.unwrap());
        }
        started.sort();

        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(40), "{:?}", started);
        }
        assert_eq!(limiter.stats().waited_requests, 3);
    }

    #[tokio::test]
    async fn test_cancel_releases_waiting_workers() {
        let limiter = Arc::new(RateLimiter::new(10_000, "cancel"));
        let cancel = CancellationToken::new();
        assert!(limiter.acquire_or_cancel(&cancel).await);

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let cancel = cancel.clone();
                tokio::spawn(async move { limiter.acquire_or_cancel(&cancel).await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let start = Instant::now();
        for waiter in waiters {
            assert!(!waiter.await.unwrap());
        }
        assert!(start.elapsed().as_millis() < 100);
    }

    #[tokio::test]
    async fn test_cancelled_token_reserves_nothing() {
        let limiter = RateLimiter::new(100, "precancelled");
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(!limiter.acquire_or_cancel(&cancel).await);
        assert_eq!(limiter.stats().total_requests, 0);
        assert!(limiter.reserve().await.is_none());
    }
}
