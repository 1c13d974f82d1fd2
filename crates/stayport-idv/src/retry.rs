//! Bounded backoff for calls to the verification provider.
//!
//! Only transport-level failures reach this module; [`crate::http`] inspects
//! response status codes itself, so a provider rejection or a 4xx answer is
//! never retried. Each verification step (OCR, status, face match) labels its
//! retries with the endpoint it was calling so a flapping provider shows up
//! per-step in the logs.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Backoff schedule applied to one provider endpoint.
///
/// The retry count comes from [`crate::IdvConfig`]; the delay before the
/// first retry doubles on every subsequent attempt.
#[derive(Debug, Clone)]
pub(crate) struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (zero-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Run `op` against the named provider endpoint, retrying per `policy`.
///
/// `op` is invoked at most `policy.max_retries + 1` times; the last error is
/// returned once the schedule is exhausted.
pub(crate) async fn with_retries<T, E, F, Fut>(
    endpoint: &str,
    policy: &RetryPolicy,
    op: F,
) -> Result<T, E>
where
    E: Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    for attempt in 0..policy.max_retries {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "provider call failed, backing off before retry"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    op().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    /// Op that fails with a transport-style error until `succeed_after`
    /// calls have been made, then yields the call count.
    fn flaky(
        counter: Arc<AtomicU32>,
        succeed_after: u32,
    ) -> impl Fn() -> std::future::Ready<Result<u32, String>> {
        move || {
            let calls = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if calls > succeed_after {
                Ok(calls)
            } else {
                Err("connection reset by peer".to_string())
            })
        }
    }

    #[tokio::test]
    async fn first_success_makes_a_single_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retries("/v1/id-card/ocr", &instant_policy(3), flaky(calls.clone(), 0))
            .await;
        assert_eq!(result, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retries(
            "/v1/id-card/status",
            &instant_policy(3),
            flaky(calls.clone(), 2),
        )
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_schedule_returns_the_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let result = with_retries(
            "/v1/face/match",
            &instant_policy(2),
            flaky(calls.clone(), u32::MAX),
        )
        .await;
        assert_eq!(result, Err("connection reset by peer".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "initial call plus two retries");
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
    }
}
