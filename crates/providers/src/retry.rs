//! Retry with backoff for completion calls.
//!
//! Two recoverable classes, mirroring the upstream behavior the
//! gateway has to live with:
//! - response-body parse failures ([`aqm_domain::Error::Json`]) retry
//!   after a short fixed delay scaled by attempt number;
//! - rate limiting ([`aqm_domain::Error::RateLimited`]) retries after
//!   an exponential delay with random jitter, doubling per attempt.
//!
//! Anything else is non-recoverable and surfaces immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use aqm_domain::{Error, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base delay for parse failures; multiplied by the attempt number.
    pub parse_delay: Duration,
    /// Base delay for rate limits; doubles per attempt.
    pub rate_limit_base: Duration,
    /// Upper bound of the uniform jitter added to rate-limit backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            parse_delay: Duration::from_millis(300),
            rate_limit_base: Duration::from_millis(700),
            max_jitter: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let base = self.rate_limit_base * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter_ms = rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64);
        base + Duration::from_millis(jitter_ms)
    }
}

/// Run `op` under the retry policy. The delays are timed suspensions
/// (`tokio::time::sleep`), never blocking sleeps.
pub async fn call_with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= policy.max_attempts => return Err(e),
            Err(Error::Json(e)) => {
                tracing::warn!(attempt, error = %e, "completion body parse failed, retrying");
                tokio::time::sleep(policy.parse_delay * attempt).await;
            }
            Err(Error::RateLimited(msg)) => {
                let delay = policy.rate_limit_delay(attempt);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %msg, "rate limited, backing off");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
