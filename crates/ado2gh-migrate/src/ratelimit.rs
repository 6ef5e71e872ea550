//! Outbound call throttling.
//!
//! Both platform clients are subject to per-account rate limits, so every
//! REST call acquires a slot from the client's [`RateLimiter`] before going
//! out on the wire.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

/// Enforces a minimum interval between consecutive calls.
///
/// Owned by a platform client instance and injected with it; never looked up
/// from ambient scope.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter allowing at most `max_calls_per_second` calls.
    pub fn new(max_calls_per_second: f64) -> Self {
        let max = if max_calls_per_second > 0.0 {
            max_calls_per_second
        } else {
            1.0
        };
        Self {
            min_interval: Duration::from_secs_f64(1.0 / max),
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the rate budget allows another call, then record it.
    ///
    /// Always eventually returns; there is no error path.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!(wait_ms = wait.as_millis() as u64, "rate limit wait");
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}
