//! Bounded exponential backoff

use crate::config::RetryConfig;
use crate::log_retry_attempt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Attempt limit and delay curve for one retried operation
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Single attempt, no waiting
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Wait before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor).min(u64::MAX as f64) as u64;
        Duration::from_millis(millis).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts
///
/// `is_retryable` decides which errors are worth another attempt; any other
/// error is returned immediately.
///
/// # Examples
///
/// ```
/// use gtfs_sync::core::retry::{retry, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// # tokio_test_block(async {
/// let calls = AtomicU32::new(0);
/// let result: Result<u32, String> = retry(
///     &RetryPolicy::none(),
///     |_e: &String| true,
///     || async { Ok(calls.fetch_add(1, Ordering::SeqCst)) },
/// )
/// .await;
/// assert_eq!(result, Ok(0));
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !is_retryable(&e) {
                    return Err(e);
                }

                let delay = policy.delay_for(attempt);
                log_retry_attempt!(attempt, policy.max_attempts, delay.as_millis() as u64, e);
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 6,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            multiplier: 2.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
    }

    #[test]
    fn test_fractional_multiplier() {
        let policy = RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 1.5,
        };
        assert_eq!(policy.delay_for(2), Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = retry(&fast_policy(5), |_| true, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("locked".to_string())
            } else {
                Ok("open")
            }
        })
        .await;

        assert_eq!(result, Ok("open"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(&fast_policy(3), |_| true, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("locked".to_string())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(
            &fast_policy(5),
            |e: &String| e == "locked",
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("corrupt".to_string())
            },
        )
        .await;

        assert_eq!(result, Err("corrupt".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
