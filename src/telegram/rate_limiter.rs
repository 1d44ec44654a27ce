//! Spacing for notifications sent to other users.
//!
//! Bursts of notifications (many valentines to one popular link) would
//! otherwise run into Telegram's flood control.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

/// Hands out send slots at least `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,

    /// Earliest instant the next send may start. `None` until the first send.
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Sleeps until the next slot and books the one after it.
    ///
    /// Returns how long the caller was held back.
    pub async fn wait_and_acquire(&self) -> Duration {
        let mut slot = self.next_slot.lock().await;
        let now = Instant::now();
        let start = slot.map_or(now, |at| at.max(now));
        let held = start - now;

        if !held.is_zero() {
            debug!("Notification delayed by {:?}", held);
            sleep_until(start).await;
        }

        *slot = Some(start + self.min_interval);
        held
    }

    /// Time left before a send would be allowed.
    pub async fn time_until_allowed(&self) -> Duration {
        let slot = self.next_slot.lock().await;
        slot.map_or(Duration::ZERO, |at| {
            at.saturating_duration_since(Instant::now())
        })
    }

    /// Blocks every sender for `retry_after` after Telegram answered
    /// `RetryAfter`, then restarts the interval.
    pub async fn handle_flood_wait(&self, retry_after: Duration) {
        warn!("Telegram asked to retry after {:?}", retry_after);
        let mut slot = self.next_slot.lock().await;
        let resume = Instant::now() + retry_after;
        sleep_until(resume).await;
        *slot = Some(resume + self.min_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_send_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_secs(1));
        assert_eq!(limiter.time_until_allowed().await, Duration::ZERO);
        assert_eq!(limiter.wait_and_acquire().await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_second_send_waits() {
        let limiter = RateLimiter::new(Duration::from_millis(100));

        limiter.wait_and_acquire().await;
        assert!(limiter.time_until_allowed().await > Duration::ZERO);
        assert!(limiter.wait_and_acquire().await > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_flood_wait_pushes_next_slot() {
        let limiter = RateLimiter::new(Duration::from_secs(60));

        limiter.handle_flood_wait(Duration::from_millis(10)).await;

        assert!(limiter.time_until_allowed().await > Duration::from_secs(59));
    }
}
