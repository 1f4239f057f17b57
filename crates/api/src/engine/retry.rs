//! Replay of transactions that lost a serialization race.

use std::future::Future;

use crate::error::AppResult;

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. Each call must open its own transaction.
pub async fn with_retry<T, F, Fut>(operation: &'static str, max_attempts: u32, mut attempt: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut tries = 1;
    loop {
        match attempt().await {
            Err(err) if err.is_retryable() && tries < max_attempts => {
                tracing::warn!(operation, attempt = tries, error = %err, "Retrying after transaction conflict");
                tries += 1;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use assert_matches::assert_matches;

    use crate::error::AppError;
    use slotbook_core::error::CoreError;

    #[tokio::test]
    async fn non_retryable_errors_return_immediately() {
        let calls = AtomicU32::new(0);
        let result: AppResult<()> = with_retry("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Core(CoreError::Validation("bad".into()))) }
        })
        .await;
        assert_matches!(result, Err(AppError::Core(CoreError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn success_is_returned_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test", 3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, AppError>(7) }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
