//! Retry-with-backoff for provider calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl BackoffPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped at `max_delay`.
    ///
    /// Non-decreasing in `retry` and never above `max_delay`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        2u32.checked_pow(retry)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Runs `operation`, retrying while `is_retryable` accepts the error and
/// attempts remain. Non-retryable errors are returned immediately.
pub async fn with_backoff<T, E, F, Fut, R>(
    policy: &BackoffPolicy,
    mut operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= max_attempts || !is_retryable(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt - 1);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    error = %err,
                    "Retryable provider error, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_delay_doubles_until_capped() {
        let policy = BackoffPolicy::default();
        let delays: Vec<u64> = (0..8).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![10, 20, 40, 80, 160, 300, 300, 300]);
    }

    #[test]
    fn test_delay_is_monotonic_and_bounded() {
        let policy = BackoffPolicy::new(5, Duration::from_millis(750), Duration::from_secs(45));
        let mut previous = Duration::ZERO;
        for retry in 0..200 {
            let delay = policy.delay_for(retry);
            assert!(delay >= previous);
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_throttling_then_succeeds() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let start = Instant::now();
        let result = with_backoff(
            &BackoffPolicy::default(),
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CloudError::throttled("Throttling", "too many requests"))
                } else {
                    Ok("done")
                }
            },
            CloudError::is_throttling,
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), CloudError> = with_backoff(
            &BackoffPolicy::default(),
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::Credential("InvalidAccessKeyId".into()))
            },
            CloudError::is_throttling,
        )
        .await;

        assert!(matches!(result, Err(CloudError::Credential(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = BackoffPolicy::new(4, Duration::from_secs(1), Duration::from_secs(2));
        let result: Result<(), CloudError> = with_backoff(
            &policy,
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(CloudError::throttled("RequestLimitExceeded", "slow down"))
            },
            CloudError::is_throttling,
        )
        .await;

        assert!(result.unwrap_err().is_throttling());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
