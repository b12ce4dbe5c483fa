//! Bounded linear backoff for rate-limited outbound calls.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Implemented by call outcomes that can report a rate limit.
pub trait RateLimitSignal {
    fn is_rate_limited(&self) -> bool;

    /// Provider-supplied wait (e.g. `Retry-After`), if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }
}

impl BackoffPolicy {
    /// Wait after rate-limited attempt `attempt` (1-based): the hint when
    /// given, else `attempt × base_delay`, never above `max_delay`.
    pub fn delay_for(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let computed = hint.unwrap_or_else(|| self.base_delay.saturating_mul(attempt));
        computed.min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BackoffRetrier {
    policy: BackoffPolicy,
}

impl BackoffRetrier {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Run `op` until it returns something other than a rate limit, or the
    /// attempt budget is spent. Errors return immediately; after the last
    /// attempt the final response is returned unmodified.
    ///
    /// Every rate-limited attempt is followed by its wait, including the last
    /// one, so a sequential caller does not hit the provider again while it is
    /// still cooling down.
    pub async fn call<F, Fut, R, E>(&self, mut op: F) -> Result<R, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: RateLimitSignal,
    {
        let mut attempt = 1u32;
        loop {
            let response = op(attempt).await?;
            if !response.is_rate_limited() {
                return Ok(response);
            }

            let wait = self.policy.delay_for(attempt, response.retry_after());
            tracing::warn!(
                attempt,
                max_attempts = self.policy.max_attempts,
                wait_ms = wait.as_millis() as u64,
                "rate limited; backing off"
            );
            tokio::time::sleep(wait).await;

            if attempt >= self.policy.max_attempts {
                return Ok(response);
            }
            attempt += 1;
        }
    }
}
