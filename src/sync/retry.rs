use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::MarkDoneConfig;
use crate::error::ServerError;

/// Exponential backoff for calls that may hit a flaky connection.
/// Retry `n` (0-based) waits `base_delay * 2^n`; only retryable errors are
/// retried, so a server rejection comes back after the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy { max_retries: 3, base_delay: Duration::from_secs(1) }
    }
}

impl From<&MarkDoneConfig> for RetryPolicy {
    fn from(config: &MarkDoneConfig) -> Self {
        RetryPolicy {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Result of a retried call plus how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub result: Result<T, ServerError>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServerError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let err = match call().await {
                Ok(value) => return Attempted { result: Ok(value), attempts },
                Err(err) => err,
            };
            let retry = attempts - 1;
            if !err.is_retryable() || retry >= self.max_retries {
                return Attempted { result: Err(err), attempts };
            }
            let delay = self.delay_for(retry);
            warn!(operation, attempt = attempts, ?delay, error = %err, "retrying after failure");
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[test]
    fn delays_double() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..3).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let start = Instant::now();
        let outcome: Attempted<()> = RetryPolicy::default()
            .run("test", || async { Err(ServerError::Network("down".into())) })
            .await;
        assert_eq!(outcome.attempts, 4);
        assert!(outcome.result.is_err());
        assert!(start.elapsed() >= Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_not_retried() {
        let calls = Mutex::new(0);
        let outcome: Attempted<()> = RetryPolicy::default()
            .run("test", || {
                *calls.lock() += 1;
                async { Err(ServerError::Rejected { status: 409, message: "no".into() }) }
            })
            .await;
        assert_eq!(outcome.attempts, 1);
        assert_eq!(*calls.lock(), 1);
    }
}
