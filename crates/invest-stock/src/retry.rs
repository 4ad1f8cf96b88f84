//! Retry with linearly increasing backoff
//!
//! Only the market-data source retries. The scraped sources try each
//! candidate URL once.

use crate::error::{Result, StockError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy: wait `attempt × backoff_step` between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay added per failed attempt
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_step: Duration::from_millis(1500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_step: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff_step,
        }
    }

    /// Delay after the given 1-based failed attempt
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }

    /// Configuration errors never succeed on a second try
    fn is_retryable(error: &StockError) -> bool {
        !matches!(error, StockError::ConfigError(_))
    }

    /// Execute an async operation with retry logic, returning the last error
    /// if all attempts fail
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            debug!(
                operation = operation_name,
                attempt,
                max_attempts = self.max_attempts,
                "Attempting operation"
            );

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = operation_name, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !Self::is_retryable(&error) || attempt >= self.max_attempts {
                warn!(
                    operation = operation_name,
                    attempt,
                    error = %error,
                    "Operation failed"
                );
                return Err(error);
            }

            let backoff = self.backoff_duration(attempt);
            warn!(
                operation = operation_name,
                attempt,
                max_attempts = self.max_attempts,
                error = %error,
                ?backoff,
                "Operation failed, retrying"
            );
            sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant() -> RetryPolicy {
        RetryPolicy::new(3, Duration::ZERO)
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(1500));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(3000));
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_execute_success_after_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = instant()
            .execute("history", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(StockError::YahooFinanceError("timeout".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_execute_all_attempts_fail() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = instant()
            .execute("history", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StockError::ApiError("503".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(StockError::ApiError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_non_retryable_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<()> = instant()
            .execute("history", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(StockError::ConfigError("bad period".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
