//! Per-step retry policy with exponential backoff.
//!
//! An attempt is a pure function of its inputs: the caller passes a factory
//! that builds a fresh request/connection for every invocation, so a handle
//! that failed once is never reused for the next attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first (1 = no retry).
    pub max_attempts: u32,
    /// Delay before the first re-attempt; doubles on each subsequent one.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn none() -> Self {
        RetryPolicy {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
        }
    }

    /// Backoff before re-attempt number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry <= 1 {
            self.initial_delay
        } else {
            self.initial_delay * 2u32.saturating_pow(retry - 1)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(750),
        }
    }
}

/// Run `attempt` up to `policy.max_attempts` times, calling `on_retry(n, max)`
/// before each re-attempt. Only retryable (`network`-classified) errors are
/// retried; anything else propagates immediately.
pub async fn run_with_retries<T, F, Fut>(
    policy: RetryPolicy,
    mut on_retry: impl FnMut(u32, u32),
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut n = 0u32;
    loop {
        n += 1;
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && n < policy.max_attempts => {
                on_retry(n, policy.max_attempts);
                tokio::time::sleep(policy.delay_for(n)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;
    use crate::platform::Platform;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn network_err() -> ProvisionError {
        ProvisionError::Network {
            platform: Platform::Hosting,
            message: "connection reset".into(),
        }
    }

    fn policy_fast(max: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max,
            initial_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles_per_retry() {
        let p = RetryPolicy {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
        };
        assert_eq!(p.delay_for(1), Duration::from_millis(500));
        assert_eq!(p.delay_for(2), Duration::from_millis(1000));
        assert_eq!(p.delay_for(3), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn always_failing_attempt_is_retried_exactly_max_minus_one_times() {
        let attempts = AtomicU32::new(0);
        let mut retries = Vec::new();
        let result: Result<()> = run_with_retries(
            policy_fast(3),
            |n, max| retries.push((n, max)),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(network_err()) }
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(retries, vec![(1, 3), (2, 3)]);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let result = run_with_retries(policy_fast(3), |_, _| {}, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(network_err())
                } else {
                    Ok(42u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retries(policy_fast(5), |_, _| {}, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(ProvisionError::Unauthorized {
                    platform: Platform::Hosting,
                    status: 401,
                })
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn policy_none_never_retries() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = run_with_retries(RetryPolicy::none(), |_, _| {}, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(network_err()) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
