//! Exponential backoff for remote calls
//!
//! The IAM endpoint throttles bursts of `ListGroupsForUser` calls. The pool
//! keeps the number of in-flight calls bounded, and each call additionally
//! backs off and retries when the failure is classified as transient.
//! The policy is fixed per client; the pipeline only ever sees the final
//! outcome of a call.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Backoff parameters
///
/// # Examples
///
/// ```
/// use awsusers::retry::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig { add_jitter: false, ..RetryConfig::default() };
/// assert_eq!(config.delay_for(1), Duration::from_millis(100));
/// assert_eq!(config.delay_for(2), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_retries: u32,

    /// Delay before the second attempt, in milliseconds
    pub initial_backoff_ms: u64,

    /// Growth factor applied per attempt
    pub backoff_factor: f64,

    /// Upper bound for a single delay, in milliseconds
    pub max_backoff_ms: u64,

    /// Spread delays by +/-10%
    pub add_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            backoff_factor: 2.0,
            max_backoff_ms: 10_000,
            add_jitter: true,
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let base = self.initial_backoff_ms as f64 * self.backoff_factor.powi(exponent);

        let jittered = if self.add_jitter {
            base * (rand::random::<f64>() * 0.2 + 0.9)
        } else {
            base
        };

        Duration::from_millis(jittered.min(self.max_backoff_ms as f64) as u64)
    }
}

/// Runs `operation` until it succeeds, fails with a non-retriable error,
/// or `config.max_retries` attempts have been made
///
/// Returns the first success or the last error.
///
/// # Examples
///
/// ```
/// use awsusers::retry::{with_exponential_backoff, RetryConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let value = with_exponential_backoff(
///     || async { Ok::<_, anyhow::Error>(7) },
///     |err| err.to_string().contains("Throttling"),
///     &RetryConfig::default(),
/// )
/// .await?;
/// assert_eq!(value, 7);
/// # Ok(())
/// # }
/// ```
pub async fn with_exponential_backoff<F, Fut, T, E, R>(
    operation: F,
    is_retriable: R,
    config: &RetryConfig,
) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        attempt += 1;
        if attempt >= config.max_retries || !is_retriable(&err) {
            return Err(err);
        }

        let delay = config.delay_for(attempt);
        debug!(
            "Attempt {}/{} failed, retrying in {:?}",
            attempt, config.max_retries, delay
        );
        sleep(delay).await;
    }
}
