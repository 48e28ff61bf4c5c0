use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Runs `factory` up to `retries + 1` times, reconnecting between failed
/// attempts.
///
/// - On success, returns immediately.
/// - On an error classified [fatal](is_fatal), re-raises immediately without
///   retrying.
/// - On any other error, or once the last attempt is spent, re-raises the
///   last error.
/// - Between attempts: `close` is called best-effort (its own errors are
///   logged and swallowed), then this task sleeps `retry_delay`, then
///   `connect` is called before the next attempt.
///
/// `factory` is invoked fresh on every attempt so that a handle captured from
/// a now-stale connection is never reused; this mirrors
/// `mqclient/broker_clients/utils.py::try_call`, generalized from a
/// single-backend helper into this crate's broker-agnostic harness.
pub async fn auto_retry<T, E, Fut, CloseFut, ConnectFut>(
    mut factory: impl FnMut() -> Fut,
    retries: u32,
    retry_delay: Duration,
    mut close: impl FnMut() -> CloseFut,
    mut connect: impl FnMut() -> ConnectFut,
    is_fatal: impl Fn(&E) -> bool,
) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    CloseFut: Future<Output = Result<(), E>>,
    ConnectFut: Future<Output = Result<(), E>>,
    E: Display,
{
    let attempts = retries + 1;

    for attempt in 1..=attempts {
        if attempt > 1 {
            debug!(attempt, attempts, "Retrying after a previous failure");
        }

        match factory().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                let fatal = is_fatal(&error);

                if fatal {
                    warn!(error = %error, "Broker adapter reported a fatal error, not retrying");
                    return Err(error);
                }

                if attempt == attempts {
                    warn!(error = %error, attempts, "Exhausted all retry attempts");
                    return Err(error);
                }

                warn!(error = %error, attempt, attempts, "Retriable error, reconnecting");
            }
        }

        if let Err(error) = close().await {
            debug!(error = %error, "Best-effort close between retry attempts failed, ignoring");
        }

        tokio::time::sleep(retry_delay).await;

        connect().await?;
    }

    unreachable!("the loop above always returns by the last attempt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    struct TestError(&'static str);

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let attempts = AtomicUsize::new(0);

        let result: Result<u32, TestError> = auto_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            },
            2,
            Duration::from_millis(1),
            || async { Ok(()) },
            || async { Ok(()) },
            |_: &TestError| false,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_up_to_the_bound_then_fails() {
        let attempts = AtomicUsize::new(0);
        let reconnects = AtomicUsize::new(0);

        let result: Result<u32, TestError> = auto_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError("transient")) }
            },
            2,
            Duration::from_millis(1),
            || async { Ok(()) },
            || {
                reconnects.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            },
            |_: &TestError| false,
        )
        .await;

        assert!(result.is_err());
        // initial + 2 retries = 3 attempts total
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // a reconnect happens between each pair of attempts: 2 reconnects
        assert_eq!(reconnects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fatal_errors_skip_retrying() {
        let attempts = AtomicUsize::new(0);

        let result: Result<u32, TestError> = auto_retry(
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError("fatal")) }
            },
            5,
            Duration::from_millis(1),
            || async { Ok(()) },
            || async { Ok(()) },
            |_: &TestError| true,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn succeeds_after_a_transient_failure() {
        let attempts = AtomicUsize::new(0);

        let result: Result<u32, TestError> = auto_retry(
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(TestError("transient"))
                    } else {
                        Ok(7)
                    }
                }
            },
            1,
            Duration::from_millis(1),
            || async { Ok(()) },
            || async { Ok(()) },
            |_: &TestError| false,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
