//! Exponential-backoff retry around a single upstream call
//!
//! The delay after failed attempt `i` (0-indexed) is `base_delay * 2^i`, and no
//! delay follows the final attempt. The whole sequence can be aborted through a
//! [`CancellationToken`] and bounded by an optional deadline.

use crate::error::{UpstreamError, UpstreamErrorKind};
use crate::Error;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Which upstream failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Retry transport failures, 429, 5xx and empty content; other 4xx are terminal.
    #[default]
    Classified,
    /// Retry every failure.
    All,
}

impl RetryPolicy {
    pub fn should_retry(&self, err: &UpstreamError) -> bool {
        match err.kind {
            UpstreamErrorKind::Cancelled | UpstreamErrorKind::DeadlineExceeded => false,
            _ if *self == RetryPolicy::All => true,
            UpstreamErrorKind::Transport
            | UpstreamErrorKind::RateLimited
            | UpstreamErrorKind::EmptyContent => true,
            UpstreamErrorKind::Status(code) => code >= 500,
        }
    }
}

impl FromStr for RetryPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classified" => Ok(RetryPolicy::Classified),
            "all" => Ok(RetryPolicy::All),
            other => Err(Error::Config(format!(
                "Unknown RETRY_POLICY '{}'. Expected 'classified' or 'all'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            policy: RetryPolicy::default(),
        }
    }
}

impl RetryConfig {
    /// Delays slept between attempts; one fewer than `max_attempts`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        (0..self.max_attempts.saturating_sub(1))
            .map(move |i| base.saturating_mul(2u32.saturating_pow(i)))
    }
}

/// Runs an upstream action until it succeeds, fails terminally, or runs out
/// of attempts.
#[derive(Debug, Clone)]
pub struct RetryingCaller {
    config: RetryConfig,
    deadline: Option<Duration>,
}

impl RetryingCaller {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Returns the first success, or the last recorded failure.
    pub async fn call<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut action: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let max_attempts = self.config.max_attempts;
        let policy = self.config.policy;
        let attempts = AtomicU32::new(0);

        let retry = RetryIf::start(
            self.config.delays(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                action()
            },
            |err: &UpstreamError| {
                let attempt = attempts.load(Ordering::SeqCst);
                let retry = policy.should_retry(err) && attempt < max_attempts;
                if retry {
                    warn!(
                        "Upstream attempt {}/{} failed: {}. Retrying...",
                        attempt, max_attempts, err
                    );
                }
                retry
            },
        );

        let guarded = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(UpstreamError::new(
                    UpstreamErrorKind::Cancelled,
                    "Upstream call was cancelled",
                )),
                result = retry => result,
            }
        };

        let result = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, guarded).await.unwrap_or_else(|_| {
                Err(UpstreamError::new(
                    UpstreamErrorKind::DeadlineExceeded,
                    format!("Request deadline of {:?} exceeded", limit),
                ))
            }),
            None => guarded.await,
        };

        if let Err(err) = &result {
            error!(
                "Upstream call failed after {} attempt(s): {}",
                attempts.load(Ordering::SeqCst),
                err
            );
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn assert_close(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(10),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn caller(policy: RetryPolicy) -> RetryingCaller {
        RetryingCaller::new(RetryConfig {
            policy,
            ..RetryConfig::default()
        })
    }

    #[test]
    fn test_default_delays_double_from_one_second() {
        let delays: Vec<Duration> = RetryConfig::default().delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(8),
            ]
        );
    }

    #[test]
    fn test_single_attempt_has_no_delays() {
        let config = RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        };
        assert_eq!(config.delays().count(), 0);
    }

    #[test]
    fn test_classified_policy() {
        let policy = RetryPolicy::Classified;
        assert!(policy.should_retry(&UpstreamError::from_status(429, "slow down")));
        assert!(policy.should_retry(&UpstreamError::from_status(503, "busy")));
        assert!(policy.should_retry(&UpstreamError::transport("reset")));
        assert!(policy.should_retry(&UpstreamError::empty_content("nothing")));
        assert!(!policy.should_retry(&UpstreamError::from_status(400, "bad")));
        assert!(!policy.should_retry(&UpstreamError::from_status(403, "denied")));
    }

    #[test]
    fn test_all_policy_retries_client_errors() {
        assert!(RetryPolicy::All.should_retry(&UpstreamError::from_status(400, "bad")));
        assert!(!RetryPolicy::All
            .should_retry(&UpstreamError::new(UpstreamErrorKind::Cancelled, "stop")));
    }

    #[test]
    fn test_policy_parses_case_insensitively() {
        assert_eq!("ALL".parse::<RetryPolicy>().unwrap(), RetryPolicy::All);
        assert_eq!(
            "classified".parse::<RetryPolicy>().unwrap(),
            RetryPolicy::Classified
        );
        assert!("never".parse::<RetryPolicy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_rate_limits_with_doubling_delays() {
        let calls = Mutex::new(Vec::new());

        let result = caller(RetryPolicy::Classified)
            .call(&CancellationToken::new(), || {
                let mut calls = calls.lock().unwrap();
                calls.push(Instant::now());
                let attempt = calls.len();
                async move {
                    if attempt < 4 {
                        Err(UpstreamError::from_status(429, "rate limited"))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 4);
        let calls = calls.into_inner().unwrap();
        let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 3);
        for (gap, secs) in gaps.iter().zip([1, 2, 4]) {
            assert_close(*gap, Duration::from_secs(secs));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_last_error_after_exhausting_attempts() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let err = caller(RetryPolicy::Classified)
            .call(&CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err::<(), _>(UpstreamError::transport(format!("failure {}", n))) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(err.message, "failure 5");
        // 1 + 2 + 4 + 8: no sleep after the final attempt.
        assert_close(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let calls = AtomicUsize::new(0);

        let err = caller(RetryPolicy::Classified)
            .call(&CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(UpstreamError::from_status(400, "invalid argument")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_policy_retries_terminal_error() {
        let calls = AtomicUsize::new(0);

        caller(RetryPolicy::All)
            .call(&CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(UpstreamError::from_status(400, "invalid argument")) }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let calls = AtomicUsize::new(0);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            trigger.cancel();
        });

        let err = caller(RetryPolicy::Classified)
            .call(&cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(UpstreamError::from_status(429, "rate limited")) }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, UpstreamErrorKind::Cancelled);
        // Attempts at t=0s and t=1s; cancelled during the 2s backoff.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_bounds_the_sequence() {
        let err = caller(RetryPolicy::Classified)
            .with_deadline(Some(Duration::from_secs(5)))
            .call(&CancellationToken::new(), || async {
                Err::<(), _>(UpstreamError::transport("unreachable"))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, UpstreamErrorKind::DeadlineExceeded);
    }
}
