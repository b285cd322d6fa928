//! Timeout wrapper for async operations.

use plume_core::PlumeError;
use std::future::Future;
use std::time::Duration;

/// Wraps an async operation with a timeout.
///
/// `operation` names the call in the resulting [`PlumeError::Timeout`].
pub async fn with_timeout<F, Fut, T>(operation: &str, duration: Duration, f: F) -> Result<T, PlumeError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, PlumeError>>,
{
    tokio::time::timeout(duration, f())
        .await
        .map_err(|_| PlumeError::Timeout(format!("{} timed out after {:?}", operation, duration)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_success() {
        let result = with_timeout("get", Duration::from_secs(1), || async { Ok::<_, PlumeError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result = with_timeout("get", Duration::from_secs(1), || async {
            Err::<u32, _>(PlumeError::cache_unavailable("connection refused"))
        })
        .await;

        assert!(matches!(result, Err(PlumeError::CacheUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_exceeded() {
        let result = with_timeout("set", Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, PlumeError>(42)
        })
        .await;

        match result {
            Err(PlumeError::Timeout(message)) => assert!(message.starts_with("set timed out")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
