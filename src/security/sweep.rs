//! Background eviction of stale rate-limit windows.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::security::rate_limit::RateLimiter;

pub struct SweepService {
    limiter: Arc<RateLimiter>,
    sweep_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl SweepService {
    pub fn new(limiter: Arc<RateLimiter>, sweep_interval_secs: u64) -> Self {
        Self {
            limiter,
            sweep_interval: Duration::from_secs(sweep_interval_secs.max(1)),
            handle: None,
        }
    }

    pub fn start(&mut self) {
        if self.handle.is_some() {
            warn!("Sweep service is already running");
            return;
        }

        let limiter = Arc::clone(&self.limiter);
        let period = self.sweep_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    info!(
                        removed,
                        tracked = limiter.tracked_clients(),
                        "Swept stale rate limit windows"
                    );
                } else {
                    debug!("No stale rate limit windows");
                }
            }
        });

        self.handle = Some(handle);
        info!(interval = ?period, "Sweep service started");
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Sweep service stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SweepService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::security::clock::ManualClock;
    use crate::security::fingerprint::Fingerprint;

    fn limiter(clock: Arc<ManualClock>) -> Arc<RateLimiter> {
        let config = RateLimitConfig {
            window_secs: 5,
            ..RateLimitConfig::default()
        };
        Arc::new(RateLimiter::new(&config, clock))
    }

    #[tokio::test]
    async fn test_sweep_service_lifecycle() {
        let clock = Arc::new(ManualClock::default());
        let mut service = SweepService::new(limiter(clock), 1);

        assert!(!service.is_running());
        service.start();
        assert!(service.is_running());

        // Second start is a no-op.
        service.start();
        assert!(service.is_running());

        service.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!service.is_running());
        service.stop();
    }

    #[tokio::test]
    async fn test_sweep_service_evicts_on_tick() {
        let clock = Arc::new(ManualClock::default());
        let limiter = limiter(clock.clone());
        limiter.admit(&Fingerprint::new("a")).unwrap();
        clock.advance(Duration::from_secs(5));

        let mut service = SweepService::new(limiter.clone(), 1);
        service.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(limiter.tracked_clients(), 0);
    }
}
