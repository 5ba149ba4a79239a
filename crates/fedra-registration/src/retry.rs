//! Retry policy for IdP-core calls.
//!
//! Retries rate limits, server errors, and connection failures; never other
//! client errors. A server-supplied Retry-After wins over the computed
//! backoff. Exhausting the attempt budget surfaces the last error unchanged.

use crate::idp_core::IdpCoreError;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy with exponential backoff and jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first (1 = no retries).
    pub max_attempts: u32,
    /// Base delay for the exponential backoff.
    pub base_delay: Duration,
    /// Cap applied to the computed delay.
    pub max_delay: Duration,
    /// Whether to spread delays by up to ±25%.
    pub use_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            use_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy with a caller-chosen attempt budget.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Disable jitter; delays become exactly 1s, 2s, 4s, ... capped.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Whether another attempt is allowed after `error` on 0-based `attempt`.
    #[must_use]
    pub fn should_retry(&self, attempt: u32, error: &IdpCoreError) -> bool {
        attempt + 1 < self.max_attempts && error.is_retryable()
    }

    /// Delay before the retry following 0-based `attempt`.
    ///
    /// A Retry-After supplied by the server is honored as-is (capped).
    /// Otherwise the base delay doubles per attempt, capped, with ±25%
    /// jitter when enabled.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &IdpCoreError) -> Duration {
        if let Some(requested) = error.retry_after() {
            return requested.min(self.max_delay);
        }

        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        if !self.use_jitter {
            return exponential;
        }

        let base_ms = exponential.as_millis() as f64;
        let jitter_range = base_ms * 0.25;
        let jitter = (rand_unit() * jitter_range * 2.0) - jitter_range;
        Duration::from_millis((base_ms + jitter).max(0.0) as u64)
    }

    /// Run an IdP-core operation under this policy.
    ///
    /// # Errors
    ///
    /// The last [`IdpCoreError`], unchanged, once the attempt budget is
    /// exhausted or a non-retryable error occurs.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, IdpCoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, IdpCoreError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "operation succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !self.should_retry(attempt, &error) {
                        if error.is_retryable() {
                            warn!(
                                operation = operation_name,
                                attempts = attempt + 1,
                                error = %error,
                                "attempt budget exhausted"
                            );
                        }
                        return Err(error);
                    }

                    let delay = self.delay_for(attempt, &error);
                    debug!(
                        operation = operation_name,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient error"
                    );

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Pseudo-random value in [0, 1) for jitter; clock-seeded, no RNG crate.
fn rand_unit() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (f64::from(nanos) / f64::from(u32::MAX)).fract()
}
