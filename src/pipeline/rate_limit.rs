//! Cooperative rate limiting for the external lookup service.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

/// Spaces calls so that at most `max_calls` run within `per`.
///
/// The gap is measured from the end of a call when the caller reports it
/// with [`RateLimiter::release`], otherwise from its start. The first call
/// never waits.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Option<Instant>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, per: Duration) -> Self {
        Self {
            interval: per / max_calls.max(1),
            next_slot: None,
        }
    }

    /// One call per second, the pace the public Overpass instances tolerate
    pub fn per_second() -> Self {
        Self::new(1, Duration::from_secs(1))
    }

    pub fn unlimited() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call may start, then reserve the slot after it
    pub async fn acquire(&mut self) {
        if let Some(slot) = self.next_slot {
            let now = Instant::now();
            if slot > now {
                debug!("Rate limiter waiting {:?}", slot - now);
                tokio::time::sleep_until(slot).await;
            }
        }
        self.next_slot = Some(Instant::now() + self.interval);
    }

    /// Mark the current call as finished; the next one waits a full
    /// interval from now
    pub fn release(&mut self) {
        let after_call = Instant::now() + self.interval;
        self.next_slot = Some(match self.next_slot {
            Some(slot) if slot > after_call => slot,
            _ => after_call,
        });
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_second()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval() {
        assert_eq!(
            RateLimiter::new(4, Duration::from_secs(2)).interval(),
            Duration::from_millis(500)
        );
        assert_eq!(RateLimiter::per_second().interval(), Duration::from_secs(1));
        // zero calls is treated as one
        assert_eq!(
            RateLimiter::new(0, Duration::from_secs(3)).interval(),
            Duration::from_secs(3)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_spacing() {
        let mut limiter = RateLimiter::per_second();
        let start = Instant::now();

        limiter.acquire().await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_after_slow_call() {
        let mut limiter = RateLimiter::per_second();
        limiter.acquire().await;

        // the call itself takes longer than the interval
        tokio::time::sleep(Duration::from_secs(5)).await;
        limiter.release();

        let before = Instant::now();
        limiter.acquire().await;
        assert!(before.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_without_release_spaces_starts() {
        let mut limiter = RateLimiter::per_second();
        limiter.acquire().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        limiter.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_unlimited() {
        let mut limiter = RateLimiter::unlimited();
        let start = std::time::Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
