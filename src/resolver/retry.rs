use futures::future::BoxFuture;

/// Run `action` up to `max_attempts` times, stopping early on the first
/// outcome `retryable` declines. The final attempt's outcome is returned
/// as-is, so callers see the last failure rather than a synthetic one.
///
/// Both the per-strategy attempt budget and the relay's 403 re-resolve loop
/// run through here.
pub async fn retry_bounded<'a, T>(
    max_attempts: u32,
    mut action: impl FnMut(u32) -> BoxFuture<'a, T> + 'a,
    mut retryable: impl FnMut(&T) -> bool,
) -> T {
    let mut attempt = 1;
    loop {
        let outcome = action(attempt).await;
        if attempt >= max_attempts || !retryable(&outcome) {
            return outcome;
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let result = retry_bounded(
            3,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { attempt >= 2 }.boxed()
            },
            |ok| !ok,
        )
        .await;

        assert!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausts_the_budget_and_returns_last_outcome() {
        let calls = AtomicU32::new(0);
        let result: Result<(), u32> = retry_bounded(
            3,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Err(attempt) }.boxed()
            },
            |outcome| outcome.is_err(),
        )
        .await;

        assert_eq!(result, Err(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_outcome_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = retry_bounded(
            5,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err("terminal") }.boxed()
            },
            |_| false,
        )
        .await;

        assert_eq!(result, Err("terminal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
