//! Bounded retry with exponential backoff.
//!
//! The decision to retry is a pure function of [`MigrationError::kind`]:
//! permanent failures (bad credentials, missing resources, rejected payloads)
//! propagate immediately instead of burning the attempt budget.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{FailureKind, MigrationError, Result};

/// Retry policy for fallible platform operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of invocations, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with explicit bounds.
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff_multiplier,
        }
    }

    /// Invoke `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// After exhaustion the last error is returned wrapped in
    /// [`MigrationError::RetryExhausted`].
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.kind() == FailureKind::Permanent => return Err(err),
                Err(err) => {
                    if attempt >= self.max_attempts {
                        return Err(MigrationError::RetryExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    warn!(
                        operation = what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.backoff_multiplier);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(100), 2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32> = policy()
            .run("op", || {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_invokes_exactly_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("op", || {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(MigrationError::NetworkError("reset".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            MigrationError::RetryExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, MigrationError::NetworkError(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = policy()
            .run("op", || {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(MigrationError::AuthenticationFailed("expired".into()))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            result.unwrap_err(),
            MigrationError::AuthenticationFailed(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_are_non_decreasing() {
        let timestamps: std::sync::Mutex<Vec<Instant>> = std::sync::Mutex::new(Vec::new());
        let policy = RetryPolicy::new(4, Duration::from_millis(100), 2.0);

        let _ = policy
            .run("op", || {
                let timestamps = &timestamps;
                async move {
                    timestamps.lock().unwrap().push(Instant::now());
                    Err::<(), _>(MigrationError::RateLimited(None))
                }
            })
            .await;

        let stamps = timestamps.into_inner().unwrap();
        assert_eq!(stamps.len(), 4);
        let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
        for pair in gaps.windows(2) {
            assert!(pair[1] >= pair[0], "delays must not decrease: {gaps:?}");
        }
        // 100ms, 200ms, 400ms
        assert!(gaps[0] >= Duration::from_millis(100));
        assert!(gaps[2] >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = policy()
            .run("op", || {
                let calls = &calls;
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(MigrationError::Timeout("slow".into()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
