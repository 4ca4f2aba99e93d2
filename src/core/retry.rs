// Retry-forever wrapper around venue calls

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::error::TradingResult;

/// Fixed-delay retry policy with optional jitter.
///
/// There is no attempt limit: a call is retried until it succeeds. The
/// reconciliation pass tolerates repeated place/cancel attempts, so liveness
/// wins over failing fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    pub fn new(delay: Duration, jitter: Duration) -> Self {
        Self { delay, jitter }
    }

    /// Zero-delay policy, used by tests
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delay before the next attempt, jitter applied
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(extra)
    }

    /// Run `operation` until it returns `Ok`, logging and sleeping between failures.
    pub async fn retry_forever<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TradingResult<T>>,
    {
        let mut attempt: u64 = 0;
        loop {
            match operation().await {
                Ok(result) => return result,
                Err(err) => {
                    attempt += 1;
                    let delay = self.next_delay();
                    warn!(
                        operation = operation_name,
                        attempt,
                        category = err.category(),
                        "⚠️  {} failed: {} ({:?}), retrying in {:?}",
                        operation_name,
                        err,
                        err,
                        delay
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TradingError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let policy = RetryPolicy::immediate();
        let result = policy
            .retry_forever("ticker", || async { Ok::<_, TradingError>(42) })
            .await;
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn test_keeps_retrying_until_success() {
        let policy = RetryPolicy::immediate();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .retry_forever("orders", || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 25 {
                        Err(TradingError::ApiConnection("connection reset".to_string()))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result, "done");
        assert_eq!(counter.load(Ordering::SeqCst), 26);
    }

    #[tokio::test]
    async fn test_retries_non_retryable_errors_too() {
        let policy = RetryPolicy::immediate();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = policy
            .retry_forever("place", || {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count == 0 {
                        Err(TradingError::Internal("unexpected payload".to_string()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result, 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::new(Duration::from_millis(100), Duration::from_millis(50));
        for _ in 0..50 {
            let delay = policy.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_default_delay_is_five_seconds() {
        assert_eq!(RetryPolicy::default().delay(), Duration::from_secs(5));
        assert_eq!(RetryPolicy::immediate().next_delay(), Duration::ZERO);
    }
}
