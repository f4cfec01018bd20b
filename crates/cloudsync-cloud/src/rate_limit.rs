//! Token-bucket rate limiting for outbound provider calls.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Token bucket settings for one adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Sustained refill rate.
    pub requests_per_second: f64,
    /// Bucket capacity, i.e. how many calls may go out back to back.
    pub burst: u32,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst: 10,
        }
    }
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket gating the calls of one adapter.
///
/// Each adapter owns its limiter; accounts never share a bucket.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        let capacity = f64::from(settings.burst.max(1));
        Self {
            rate: settings.requests_per_second.max(f64::MIN_POSITIVE),
            capacity,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Takes one token, waiting for the bucket to refill if it is empty.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.refill(&mut state);
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };
            tracing::trace!(wait_ms = wait.as_millis() as u64, "Rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes one token if one is available right now.
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available.
    pub async fn available(&self) -> u32 {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        state.tokens.floor() as u32
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(state.last_refill);
        state.tokens = (state.tokens + elapsed.as_secs_f64() * self.rate).min(self.capacity);
        state.last_refill = now;
    }
}
