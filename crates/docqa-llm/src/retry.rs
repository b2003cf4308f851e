use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

const MAX_BACKOFF_SHIFT: u32 = 16;

/// Bounded retry with exponential backoff and a mandatory per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one. Zero disables retrying.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, base_backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
            timeout,
        }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff
            .saturating_mul(1u32 << attempt.min(MAX_BACKOFF_SHIFT))
    }

    /// Run `f` until it succeeds, fails permanently, or the retry budget is spent.
    ///
    /// Each attempt is bounded by `self.timeout`; an elapsed attempt yields
    /// `LlmError::Timeout` and counts as transient.
    ///
    /// # Errors
    ///
    /// Returns the last error once attempts are exhausted, or the first non-transient error.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut f: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        loop {
            let err = match tokio::time::timeout(self.timeout, f()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => LlmError::Timeout {
                    operation,
                    seconds: self.timeout.as_secs(),
                },
            };

            if attempt >= self.max_retries || !err.is_transient() {
                return Err(err);
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                operation,
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "transient provider failure, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
