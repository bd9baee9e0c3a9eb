//! Bounded polling against live page state

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::driver::traits::DriverResult;
use crate::error::WaitError;

/// Floor for the poll interval so a zero setting cannot spin
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Ceiling for the poll interval; slower polling visibly delays the suite
pub const MAX_INTERVAL: Duration = Duration::from_millis(99);

/// Polls a predicate at a fixed interval until it holds or a deadline passes
#[derive(Debug, Clone, Copy)]
pub struct ConditionWaiter {
    interval: Duration,
}

impl ConditionWaiter {
    pub fn new(interval: Duration) -> Self {
        if interval > MAX_INTERVAL {
            log::warn!(
                "Poll interval {}ms is too coarse, using {}ms",
                interval.as_millis(),
                MAX_INTERVAL.as_millis()
            );
        }
        Self {
            interval: interval.clamp(MIN_INTERVAL, MAX_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Evaluate `predicate` until it returns `true` or `timeout` elapses.
    ///
    /// The predicate is always evaluated at least once, and each evaluation is
    /// itself bounded by the time left. A predicate that is merely false never
    /// fails the wait early; only the deadline does. Driver errors from the
    /// predicate are returned as they happen.
    ///
    /// Returns the time it took for the condition to hold.
    pub async fn wait_until<F, Fut>(&self, mut predicate: F, timeout: Duration) -> Result<Duration, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DriverResult<bool>>,
    {
        let start = Instant::now();

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            match tokio::time::timeout(remaining, predicate()).await {
                Ok(Ok(true)) => return Ok(start.elapsed()),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => return Err(WaitError::Driver(e)),
                Err(_) => log::debug!("Predicate evaluation outlived the remaining wait"),
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Err(WaitError::Timeout { elapsed, timeout });
            }

            let remaining = timeout - elapsed;
            tokio::time::sleep(self.interval.min(remaining)).await;
        }
    }
}

impl Default for ConditionWaiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

/// Fixed delay for settling that has no observable completion signal.
///
/// Weaker than [`ConditionWaiter::wait_until`]: it neither proves the page
/// reached the expected state nor fails fast when it never will. Each use is
/// logged so it stays visible.
pub async fn settle(duration: Duration) {
    log::debug!(
        "Fixed delay of {}ms (no completion signal to poll)",
        duration.as_millis()
    );
    tokio::time::sleep(duration).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DriverError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_interval_is_clamped() {
        assert_eq!(ConditionWaiter::new(Duration::from_millis(50)).interval(), Duration::from_millis(50));
        assert_eq!(ConditionWaiter::new(Duration::from_secs(2)).interval(), MAX_INTERVAL);
    }

    #[tokio::test]
    async fn test_succeeds_before_timeout() {
        let waiter = ConditionWaiter::new(Duration::from_millis(5));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let elapsed = waiter
            .wait_until(
                move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move { Ok(n >= 3) }
                },
                Duration::from_secs(2),
            )
            .await
            .unwrap();

        assert!(elapsed < Duration::from_secs(2));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_times_out_after_deadline() {
        let waiter = ConditionWaiter::new(Duration::from_millis(10));
        let timeout = Duration::from_millis(120);

        let err = waiter
            .wait_until(|| async { Ok(false) }, timeout)
            .await
            .unwrap_err();

        match err {
            WaitError::Timeout { elapsed, timeout: t } => {
                assert_eq!(t, timeout);
                assert!(elapsed >= timeout);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_immediate_truth_with_zero_timeout() {
        let waiter = ConditionWaiter::default();
        let result = waiter.wait_until(|| async { Ok(true) }, Duration::ZERO).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_hung_predicate_is_bounded() {
        let waiter = ConditionWaiter::new(Duration::from_millis(10));
        let timeout = Duration::from_millis(100);
        let start = Instant::now();

        let err = waiter
            .wait_until(
                || async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(true)
                },
                timeout,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_driver_error_propagates() {
        let waiter = ConditionWaiter::default();
        let err = waiter
            .wait_until(
                || async { Err(DriverError::SessionClosed) },
                Duration::from_secs(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Driver(DriverError::SessionClosed)));
    }

    #[test]
    fn test_zero_interval_clamped() {
        assert_eq!(ConditionWaiter::new(Duration::ZERO).interval(), MIN_INTERVAL);
    }
}
