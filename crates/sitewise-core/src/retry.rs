//! Retry with exponential backoff for transient storage and capability faults

use backon::{ExponentialBuilder, Retryable};
use std::future::Future;
use std::time::Duration;

use crate::error::{Result, SitewiseError};

/// Attempt cap and backoff bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy without sleeps between attempts
    pub fn immediate(max_attempts: usize) -> Self {
        Self { max_attempts, base_delay: Duration::ZERO, max_delay: Duration::ZERO }
    }

    /// Base delay doubling per attempt, capped at `max_delay`
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or the
/// attempt cap is reached.
pub async fn retry_transient<T, F, Fut>(policy: &RetryPolicy, operation: &str, f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    f.retry(policy.backoff())
        .when(|err: &SitewiseError| err.is_retryable())
        .notify(|err: &SitewiseError, delay: Duration| {
            tracing::warn!(
                operation,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = retry_transient(&RetryPolicy::immediate(3), "load", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SitewiseError::storage_transient("load", "slow down"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_attempt_cap() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<()> = retry_transient(&RetryPolicy::immediate(3), "invoke", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SitewiseError::Throttled { function: "terrain".into() })
            }
        })
        .await;

        assert!(matches!(result, Err(SitewiseError::Throttled { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result: Result<()> = retry_transient(&RetryPolicy::immediate(5), "invoke", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(SitewiseError::CapabilityNotFound { function: "report".into() })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
