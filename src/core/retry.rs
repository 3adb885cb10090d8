//! Retry logic with exponential backoff.
//!
//! Used around language model calls, where rate limits and transient
//! upstream failures are routine.

use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries).
    pub max_attempts: u32,

    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// Multiplier applied per attempt.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::api()
    }
}

impl RetryConfig {
    /// Settings for LLM API calls.
    pub fn api() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(20),
            backoff_multiplier: 2.0,
        }
    }

    /// Same as [`RetryConfig::api`] with a different attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let millis = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped as u64)
    }

    /// Backoff delay raised to at least `floor`, still capped at `max_delay`.
    pub fn delay_with_floor(&self, attempt: u32, floor: Duration) -> Duration {
        self.delay_for_attempt(attempt).max(floor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, `retry_delay` rejects the error,
/// or the attempt budget is spent. Returns the last result.
///
/// `retry_delay` returns `None` for errors not worth retrying, otherwise
/// the minimum wait the error asks for (e.g. a `Retry-After` header).
pub async fn retry_async<T, E, F, Fut, P>(
    config: &RetryConfig,
    mut operation: F,
    retry_delay: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> Option<Duration>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_attempts => {
                let Some(floor) = retry_delay(&e) else {
                    return Err(e);
                };
                attempt += 1;
                let delay = config.delay_with_floor(attempt, floor);
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
