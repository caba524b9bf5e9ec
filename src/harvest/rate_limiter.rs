//! Token-bucket rate limiter
//!
//! Every outbound page request, including retries, passes through
//! [`RateLimiter::acquire`]. The bucket holds at most `burst` tokens and
//! refills continuously at `qps` tokens per second.

use crate::config::RateLimitConfig;
use rand::Rng;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Extra delay applied even when a token is immediately available
const MAX_IDLE_JITTER_SECS: f64 = 0.1;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

/// Gates requests to a steady rate with a small burst allowance
///
/// Safe to share behind an `Arc`. The bucket mutex is held while a caller
/// waits for its token, so concurrent callers queue in order instead of
/// racing for the same refill.
#[derive(Debug)]
pub struct RateLimiter {
    qps: f64,
    burst: f64,
    jitter_min: f64,
    jitter_max: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Creates a limiter starting with a full bucket
    ///
    /// # Arguments
    ///
    /// * `qps` - Refill rate in tokens per second
    /// * `burst` - Bucket capacity
    /// * `jitter_min` / `jitter_max` - Bounds of the multiplicative jitter applied to waits
    pub fn new(qps: f64, burst: u32, jitter_min: f64, jitter_max: f64) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            qps,
            burst,
            jitter_min,
            jitter_max,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_update: Instant::now(),
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.qps, config.burst, config.jitter_min, config.jitter_max)
    }

    /// Waits until a token is available and consumes it
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.qps).min(self.burst);
        bucket.last_update = now;

        if bucket.tokens < 1.0 {
            let jitter = self.jitter();
            let wait = (1.0 - bucket.tokens) / self.qps * (1.0 + jitter);
            tracing::debug!("Rate limit: waiting {:.2}s for a token", wait);

            // The wait pays for this token; no debt carries over
            bucket.tokens = 0.0;
            tokio::time::sleep(Duration::from_secs_f64(wait)).await;
            bucket.last_update = Instant::now();
        } else {
            bucket.tokens -= 1.0;
            let idle = rand::thread_rng().gen_range(0.0..=MAX_IDLE_JITTER_SECS);
            tokio::time::sleep(Duration::from_secs_f64(idle)).await;
        }
    }

    /// Tokens currently in the bucket, without refilling
    pub async fn available_tokens(&self) -> f64 {
        self.bucket.lock().await.tokens
    }

    fn jitter(&self) -> f64 {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }
        rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max)
    }
}
