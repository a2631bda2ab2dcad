//! Retry with exponential backoff for upstream calls (OpenRouter, SMTP).

use std::future::Future;
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(2, Duration::from_millis(250), Duration::from_secs(4))
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
        }
    }

    /// Same backoff, different attempt budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Execute an async operation, retrying only errors that `retryable` accepts.
///
/// Delays double after each failed attempt, capped at `config.max_delay`.
/// A non-retryable error is returned immediately; otherwise the last error
/// is returned once `config.max_retries` retries are spent.
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    mut operation: F,
    retryable: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut attempts = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempts += 1;
                if attempts > config.max_retries || !retryable(&e) {
                    return Err(e);
                }

                tracing::warn!(
                    "Upstream call failed (attempt {}/{}): {}. Retrying in {:?}...",
                    attempts,
                    config.max_retries + 1,
                    e,
                    delay
                );

                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(config.max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryConfig {
        RetryConfig::new(3, Duration::from_millis(5), Duration::from_millis(20))
    }

    #[tokio::test]
    async fn test_retry_success_after_failures() {
        let attempts = AtomicU32::new(0);

        let result: Result<i32, &str> = with_retry_if(
            &fast(),
            || {
                let count = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if count < 3 {
                        Err("connection reset")
                    } else {
                        Ok(42)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let config = fast().with_max_retries(1);
        let attempts = AtomicU32::new(0);

        let result: Result<i32, &str> = with_retry_if(
            &config,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("still down") }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("still down"));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let attempts = AtomicU32::new(0);

        let result: Result<i32, u16> = with_retry_if(
            &fast(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(429) }
            },
            |status: &u16| *status >= 500,
        )
        .await;

        assert_eq!(result, Err(429));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_retries_runs_once() {
        let config = fast().with_max_retries(0);
        let attempts = AtomicU32::new(0);

        let result: Result<(), u16> = with_retry_if(
            &config,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(503) }
            },
            |status: &u16| *status >= 500,
        )
        .await;

        assert_eq!(result, Err(503));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
