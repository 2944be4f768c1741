//! Shared exponential-backoff retry helper for the Embedder and
//! Completion clients (§4.C, §4.D: "retries identically").

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Outcome of a retryable operation, distinguishing errors worth retrying
/// from terminal ones.
pub enum Attempt<T, E> {
    Ok(T),
    Retryable(E),
    Terminal(E),
}

/// Run `op` up to `budget + 1` times, doubling `base_delay` between
/// retryable failures. Returns the last error (retryable or terminal) if
/// the budget is exhausted, or immediately on a terminal error. Honors
/// `cancel` between attempts.
pub async fn with_retry<T, E, F, Fut>(
    budget: u32,
    base_delay: Duration,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T, E>>,
{
    let mut delay = base_delay;
    let mut attempts_left = budget + 1;

    loop {
        match op().await {
            Attempt::Ok(value) => return Ok(value),
            Attempt::Terminal(err) => return Err(err),
            Attempt::Retryable(err) => {
                attempts_left -= 1;
                if attempts_left == 0 {
                    return Err(err);
                }
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(err),
                }
                delay *= 2;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry_on_first_ok() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(3, Duration::from_millis(1), &cancel, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Ok(42)
        })
        .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_budget_then_fails() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(2, Duration::from_millis(1), &cancel, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Retryable("transient")
        })
        .await;
        assert_eq!(result, Err("transient"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_error_short_circuits_retry() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(5, Duration::from_millis(1), &cancel, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Attempt::Terminal("bad request")
        })
        .await;
        assert_eq!(result, Err("bad request"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
