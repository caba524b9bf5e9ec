use crate::config::BackoffConfig;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Exponential backoff for retryable failures
///
/// Keeps its own attempt counter, independent of the rate limiter. The
/// counter is atomic so a shared policy can be advanced from several tasks.
#[derive(Debug)]
pub struct BackoffPolicy {
    base: Duration,
    max_delay: Duration,
    jitter_min: f64,
    jitter_max: f64,
    max_retries: u32,
    attempt: AtomicU32,
}

impl BackoffPolicy {
    pub fn new(
        base: Duration,
        max_delay: Duration,
        jitter_min: f64,
        jitter_max: f64,
        max_retries: u32,
    ) -> Self {
        Self {
            base,
            max_delay,
            jitter_min,
            jitter_max,
            max_retries,
            attempt: AtomicU32::new(0),
        }
    }

    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(
            Duration::from_millis(config.base_ms),
            Duration::from_millis(config.max_delay_ms),
            config.jitter_min,
            config.jitter_max,
            config.max_retries,
        )
    }

    /// `min(base * 2^attempt, max_delay) * (1 + jitter)`
    pub fn next_delay(&self) -> Duration {
        let attempt = self.attempt().min(62);
        let exponential = self.base.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped * (1.0 + self.jitter()))
    }

    /// Sleeps for the next delay, then counts the attempt
    pub async fn sleep_and_advance(&self) -> Duration {
        let delay = self.next_delay();
        tracing::debug!(
            "Backing off {:.2}s (attempt {})",
            delay.as_secs_f64(),
            self.attempt() + 1
        );
        tokio::time::sleep(delay).await;
        self.attempt.fetch_add(1, Ordering::SeqCst);
        delay
    }

    /// Called after every successful request
    pub fn reset(&self) {
        self.attempt.store(0, Ordering::SeqCst);
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::SeqCst)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// True once `max_retries` delays have been taken since the last reset
    pub fn exhausted(&self) -> bool {
        self.attempt() >= self.max_retries
    }

    fn jitter(&self) -> f64 {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(jitter_min: f64, jitter_max: f64) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            jitter_min,
            jitter_max,
            3,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_doubles_until_cap() {
        let backoff = policy(0.0, 0.0);
        let expected = [1, 2, 4, 8, 16, 32, 60, 60];

        for secs in expected {
            assert_eq!(backoff.next_delay(), Duration::from_secs(secs));
            backoff.sleep_and_advance().await;
        }
        assert_eq!(backoff.attempt(), 8);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let backoff = policy(0.1, 0.3);
        for _ in 0..100 {
            let delay = backoff.next_delay().as_secs_f64();
            assert!((1.1 - 1e-9..=1.3 + 1e-9).contains(&delay), "delay {}", delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_exhaustion() {
        let backoff = policy(0.0, 0.0);
        assert!(!backoff.exhausted());

        for _ in 0..3 {
            backoff.sleep_and_advance().await;
        }
        assert!(backoff.exhausted());

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_and_advance_waits() {
        let backoff = policy(0.0, 0.0);
        backoff.sleep_and_advance().await;

        let start = tokio::time::Instant::now();
        let slept = backoff.sleep_and_advance().await;

        assert_eq!(slept, Duration::from_secs(2));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
