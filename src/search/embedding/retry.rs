//! Bounded exponential backoff for transient provider failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::search::core::config::RetryConfig;
use crate::search::core::errors::SearchResult;

/// Execute an async operation, retrying transient failures with exponential
/// backoff (`base_delay * 2^attempt`, jittered, capped). Non-transient
/// errors fail immediately without retry.
///
/// # Errors
/// Returns the last error once retries are exhausted, or the first
/// non-transient error.
pub async fn retry_transient<F, Fut, T>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> SearchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SearchResult<T>>,
{
    let mut attempt: u32 = 0;

    loop {
        match call().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation, attempts = attempt + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                let exponential = config
                    .base_delay_ms
                    .saturating_mul(2_u64.saturating_pow(attempt));
                let capped = exponential.min(config.max_delay_ms);
                let jitter = rand::thread_rng().gen_range(0..=capped / 4 + 1);
                let delay = Duration::from_millis(capped + jitter);
                warn!(operation, attempt = attempt + 1, ?delay, error = %err, "transient failure, retrying");
                sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::core::errors::SearchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicUsize::new(0);
        let result = retry_transient(&config(), "embed", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(SearchError::ProviderTransient("503".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.expect("eventually succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_fails_immediately() {
        let calls = AtomicUsize::new(0);
        let result: SearchResult<()> = retry_transient(&config(), "embed", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SearchError::ProviderFatal("400".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let calls = AtomicUsize::new(0);
        let result: SearchResult<()> = retry_transient(&config(), "embed", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(SearchError::ProviderTransient("503".to_string())) }
        })
        .await;
        assert!(result.is_err());
        // Initial call plus max_retries attempts.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
