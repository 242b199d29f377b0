//! Bounded retry with exponential backoff.

use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::types::config::RetryPolicy;

/// Result of a retried operation plus how many attempts it took.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: FetchResult<T>,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
///
/// `op` receives the 1-based attempt number. Only errors for which
/// [`FetchError::is_retryable`] holds are retried. Cancelling `cancel`
/// interrupts the backoff sleep and returns the last error.
pub async fn with_retry<T, Op, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: Op,
) -> Attempted<T>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = op(attempt).await;

        let err = match result {
            Ok(value) => {
                return Attempted {
                    result: Ok(value),
                    attempts: attempt,
                }
            }
            Err(err) => err,
        };

        if !err.is_retryable() || attempt >= max_attempts {
            if err.is_retryable() {
                warn!(attempt, error = %err, "Giving up after final attempt");
            }
            return Attempted {
                result: Err(err),
                attempts: attempt,
            };
        }

        attempt += 1;
        let delay = policy.delay_before(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "Retrying");

        tokio::select! {
            _ = cancel.cancelled() => {
                return Attempted {
                    result: Err(err),
                    attempts: attempt - 1,
                };
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Convenience for callers that only care about the final result.
pub async fn retry_fetch<T, Op, Fut>(policy: &RetryPolicy, op: Op) -> Result<T, FetchError>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    with_retry(policy, &CancellationToken::new(), op).await.result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn unavailable() -> FetchError {
        FetchError::HttpStatus {
            url: "https://example.com".to_string(),
            status: 503,
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = with_retry(&policy(), &CancellationToken::new(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(unavailable())
                } else {
                    Ok("markup")
                }
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), "markup");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let outcome: Attempted<()> =
            with_retry(&policy(), &CancellationToken::new(), |_| async { Err(unavailable()) }).await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let outcome: Attempted<()> = with_retry(&policy(), &CancellationToken::new(), |_| async {
            Err(FetchError::HttpStatus {
                url: "https://example.com".to_string(),
                status: 403,
            })
        })
        .await;

        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff() {
        let slow = RetryPolicy::new(3, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome: Attempted<()> = with_retry(&slow, &cancel, |_| async { Err(unavailable()) }).await;

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.result.is_err());
    }

    #[tokio::test]
    async fn test_retry_fetch_returns_value() {
        let value = retry_fetch(&policy(), |_| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
