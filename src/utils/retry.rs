use std::time::Duration;
use tokio::time::sleep;

// ============================================================================
// Exponential Backoff Retry Strategy
// ============================================================================
//
// Caller-side retry for operations whose failures may clear on a fresh
// attempt, such as reload-and-recompute after an optimistic concurrency
// conflict. The event store itself never retries.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_secs(1),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff before the attempt following `attempt` (1-based), capped at `max_delay`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub enum RetryResult<T, E> {
    Success(T),
    /// Every attempt failed with a transient error; holds the last one
    Failed(E),
    /// A permanent error stopped the loop early
    PermanentFailure(E),
}

impl<T, E> RetryResult<T, E> {
    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed(error) | RetryResult::PermanentFailure(error) => Err(error),
        }
    }
}

/// Separates errors a fresh attempt may clear from ones it never will
pub trait IsTransient {
    fn is_transient(&self) -> bool;
}

/// Run `operation` against `aggregate_id` until it succeeds, fails permanently,
/// or `max_attempts` is used up
///
/// Each attempt is expected to start from freshly loaded state, so a lost
/// concurrency race is decided again rather than replayed.
pub async fn retry_on_transient<F, Fut, T, E>(
    config: RetryConfig,
    aggregate_id: &str,
    mut operation: F,
) -> RetryResult<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display + IsTransient,
{
    let mut attempt = 1;

    loop {
        let error = match operation(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        aggregate_id = %aggregate_id,
                        attempt = attempt,
                        "Command succeeded after reload"
                    );
                }
                return RetryResult::Success(value);
            }
            Err(error) => error,
        };

        if !error.is_transient() {
            tracing::debug!(aggregate_id = %aggregate_id, error = %error, "Permanent failure, not retrying");
            return RetryResult::PermanentFailure(error);
        }

        if attempt >= config.max_attempts {
            tracing::warn!(
                aggregate_id = %aggregate_id,
                attempts = attempt,
                error = %error,
                "Giving up after repeated transient failures"
            );
            return RetryResult::Failed(error);
        }

        let delay = config.delay_after(attempt);
        tracing::debug!(
            aggregate_id = %aggregate_id,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Transient failure, reloading before next attempt"
        );

        sleep(delay).await;
        attempt += 1;
    }
}
