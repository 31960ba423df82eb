//! Per-client rate limiting on top of the window counter.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::config::RateLimitConfig;
use crate::security::clock::Clock;
use crate::security::fingerprint::Fingerprint;
use crate::security::window::WindowCounter;

/// Remaining-quota metadata reported on every request that reached the limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: SystemTime,
}

/// A request over the per-window ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded, retry after {}s", .retry_after.as_secs())]
pub struct RateLimitExceeded {
    pub quota: Quota,
    pub retry_after: Duration,
}

/// Fixed-window limiter. Always on; the ceiling and window come from config.
#[derive(Debug)]
pub struct RateLimiter {
    counter: WindowCounter,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            counter: WindowCounter::new(clock, config.max_tracked_clients),
            window: Duration::from_secs(config.window_secs),
            max_requests: config.max_requests,
        }
    }

    /// Count the request and decide. Rejected attempts still count toward the window.
    pub fn admit(&self, fingerprint: &Fingerprint) -> Result<Quota, RateLimitExceeded> {
        let decision = self
            .counter
            .check_and_increment(fingerprint, self.window, self.max_requests);

        let quota = Quota {
            limit: self.max_requests,
            remaining: decision.remaining,
            reset_at: decision.reset_at,
        };

        if decision.allowed {
            return Ok(quota);
        }

        let now = self.counter.clock().now();
        let until_reset = decision.reset_at.duration_since(now).unwrap_or_default();
        tracing::warn!(
            client = %fingerprint,
            retry_after_ms = until_reset.as_millis() as u64,
            "Rate limit exceeded"
        );

        Err(RateLimitExceeded {
            quota,
            retry_after: retry_after_secs(until_reset),
        })
    }

    /// Evict windows that have closed.
    pub fn sweep(&self) -> usize {
        self.counter.sweep(self.window)
    }

    pub fn tracked_clients(&self) -> usize {
        self.counter.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Whole seconds, rounded up, never below one.
fn retry_after_secs(until_reset: Duration) -> Duration {
    let mut secs = until_reset.as_secs();
    if until_reset.subsec_nanos() > 0 {
        secs += 1;
    }
    Duration::from_secs(secs.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    fn limiter(max_requests: u32, window_secs: u64) -> (Arc<ManualClock>, RateLimiter) {
        let clock = Arc::new(ManualClock::default());
        let config = RateLimitConfig {
            max_requests,
            window_secs,
            ..RateLimitConfig::default()
        };
        (clock.clone(), RateLimiter::new(&config, clock))
    }

    #[test]
    fn test_sixty_in_one_second_then_rejected() {
        let (clock, limiter) = limiter(60, 60);
        let fp = Fingerprint::new("1.2.3.4");

        let mut last = None;
        for i in 0..60 {
            let quota = limiter.admit(&fp).unwrap();
            assert_eq!(quota.remaining, 59 - i);
            last = Some(quota);
        }
        assert_eq!(last.unwrap().remaining, 0);

        clock.advance(Duration::from_millis(900));
        let rejected = limiter.admit(&fp).unwrap_err();
        assert_eq!(rejected.quota.remaining, 0);
        assert_eq!(rejected.quota.limit, 60);
        assert_eq!(rejected.retry_after, Duration::from_secs(60));
    }

    #[test]
    fn test_admitted_again_after_reset() {
        let (clock, limiter) = limiter(3, 10);
        let fp = Fingerprint::new("1.2.3.4");
        for _ in 0..3 {
            limiter.admit(&fp).unwrap();
        }
        let reset_at = limiter.admit(&fp).unwrap_err().quota.reset_at;

        clock.advance(reset_at.duration_since(clock.now()).unwrap());
        assert_eq!(limiter.admit(&fp).unwrap().remaining, 2);
    }

    #[test]
    fn test_retry_after_rounds_up_with_floor() {
        assert_eq!(retry_after_secs(Duration::ZERO), Duration::from_secs(1));
        assert_eq!(retry_after_secs(Duration::from_millis(1500)), Duration::from_secs(2));
        assert_eq!(retry_after_secs(Duration::from_secs(7)), Duration::from_secs(7));
    }

    #[test]
    fn test_sweep_drops_closed_windows() {
        let (clock, limiter) = limiter(5, 10);
        limiter.admit(&Fingerprint::new("a")).unwrap();
        limiter.admit(&Fingerprint::new("b")).unwrap();
        assert_eq!(limiter.tracked_clients(), 2);

        clock.advance(Duration::from_secs(10));
        assert_eq!(limiter.sweep(), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }
}
