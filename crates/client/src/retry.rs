//! Retrying provider calls with exponential backoff.
//!
//! ### Policy
//!
//! - Up to `max_attempts` attempts (default 3).
//! - After the n-th failed attempt the client waits `base_delay * 2^(n-1)`,
//!   plus, when jitter is enabled, a uniform random delay in `[0, base_delay)`.
//!   Jitter stays below one base step, so delays never decrease.
//! - Terminal failures (quota exhaustion) return immediately.
//! - Every attempt, successful, failed or abandoned on cancellation, is
//!   appended to the audit log.
//! - Cancellation stops further attempts and interrupts the backoff sleep.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sitelens_core::AppConfig;
use tokio_util::sync::CancellationToken;

use crate::{AuditLog, ProviderError};

/// Largest exponent applied to the base delay.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Backoff policy for provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(2), jitter: true }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self { max_attempts: config.max_attempts.max(1), base_delay: config.base_delay(), jitter: config.retry_jitter }
    }

    /// Delay before the next attempt once `failed_attempts` attempts have failed,
    /// without jitter.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

/// Why a retried call produced no result.
#[derive(Debug, thiserror::Error)]
pub enum RetryError {
    /// Every attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: ProviderError },

    /// A failure for which retrying is futile.
    #[error("terminal failure: {0}")]
    Terminal(ProviderError),

    /// The caller cancelled the call.
    #[error("cancelled")]
    Cancelled,
}

/// Runs provider calls under a [`RetryPolicy`] and audits every attempt.
#[derive(Debug, Clone)]
pub struct RetryingClient {
    policy: RetryPolicy,
    audit: AuditLog,
    rng: Arc<Mutex<StdRng>>,
}

impl RetryingClient {
    pub fn new(policy: RetryPolicy, audit: AuditLog) -> Self {
        Self { policy, audit, rng: Arc::new(Mutex::new(StdRng::from_entropy())) }
    }

    /// Client with a seeded jitter source, for reproducible delays.
    pub fn with_rng(policy: RetryPolicy, audit: AuditLog, rng: StdRng) -> Self {
        Self { policy, audit, rng: Arc::new(Mutex::new(rng)) }
    }

    /// Delay before the next attempt, jitter included.
    pub fn delay_after(&self, failed_attempts: u32) -> Duration {
        let base = self.policy.backoff(failed_attempts);
        let bound = self.policy.base_delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if !self.policy.jitter || bound == 0 {
            return base;
        }

        let jitter_ms = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(0..bound)
        };
        base + Duration::from_millis(jitter_ms)
    }

    /// Run `op` until it succeeds, fails terminally, exhausts the policy, or
    /// `cancel` fires.
    ///
    /// `query` and `credential_suffix` are recorded in the audit log for each
    /// attempt.
    pub async fn execute<T, F, Fut>(
        &self, query: &str, credential_suffix: Option<&str>, cancel: &CancellationToken, mut op: F,
    ) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled);
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.audit.record(query, false, credential_suffix).await;
                    tracing::warn!(query, attempt, "provider call abandoned on cancellation");
                    return Err(RetryError::Cancelled);
                }
                outcome = op() => outcome,
            };

            match outcome {
                Ok(value) => {
                    self.audit.record(query, true, credential_suffix).await;
                    if attempt > 1 {
                        tracing::info!(query, attempt, "provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => {
                    self.audit.record(query, false, credential_suffix).await;

                    if err.is_terminal() {
                        tracing::error!(query, attempt, "provider call failed terminally: {}", err);
                        return Err(RetryError::Terminal(err));
                    }

                    if attempt >= max_attempts {
                        tracing::error!(query, attempts = attempt, "provider call exhausted retries: {}", err);
                        return Err(RetryError::Exhausted { attempts: attempt, last: err });
                    }

                    let delay = self.delay_after(attempt);
                    tracing::warn!(
                        query,
                        attempt,
                        max_attempts,
                        "provider call failed: {}; retrying after {:?}",
                        err,
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn policy(jitter: bool) -> RetryPolicy {
        RetryPolicy { max_attempts: 3, base_delay: Duration::from_secs(2), jitter }
    }

    #[test]
    fn test_backoff_doubles() {
        let p = policy(false);
        assert_eq!(p.backoff(1), Duration::from_secs(2));
        assert_eq!(p.backoff(2), Duration::from_secs(4));
        assert_eq!(p.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates() {
        let p = policy(false);
        assert_eq!(p.backoff(1_000), Duration::from_secs(2) * (1 << MAX_BACKOFF_EXPONENT));
    }

    #[test]
    fn test_jitter_bounded_and_monotonic() {
        let client = RetryingClient::with_rng(policy(true), AuditLog::disabled(), StdRng::seed_from_u64(7));
        for _ in 0..100 {
            let first = client.delay_after(1);
            let second = client.delay_after(2);
            assert!(first >= Duration::from_secs(2) && first < Duration::from_secs(4));
            assert!(second >= Duration::from_secs(4) && second < Duration::from_secs(6));
            assert!(second >= first);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_after_max_attempts() {
        let audit = AuditLog::in_memory();
        let client = RetryingClient::with_rng(policy(true), audit.clone(), StdRng::seed_from_u64(1));
        let calls = AtomicU32::new(0);
        let started = StdMutex::new(Vec::new());

        let result: Result<(), RetryError> = client
            .execute("q", Some("abcd"), &CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                started.lock().unwrap().push(Instant::now());
                async { Err(ProviderError::HttpError { status: 503 }) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let started = started.into_inner().unwrap();
        let gaps: Vec<Duration> = started.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 2);
        assert!(gaps[0] >= Duration::from_secs(2));
        assert!(gaps[1] >= gaps[0]);

        let records = audit.records().await;
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.success && r.credential_suffix.as_deref() == Some("abcd")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_error_never_retried() {
        let audit = AuditLog::in_memory();
        let client = RetryingClient::new(policy(false), audit.clone());
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError> = client
            .execute("q", None, &CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::QuotaExhausted("Your account has run out of searches.".into())) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Terminal(ProviderError::QuotaExhausted(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(audit.records().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failure() {
        let audit = AuditLog::in_memory();
        let client = RetryingClient::new(policy(false), audit.clone());
        let calls = AtomicU32::new(0);

        let result = client
            .execute("q", None, &CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move { if n == 0 { Err(ProviderError::Malformed("truncated".into())) } else { Ok(42) } }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        let flags: Vec<bool> = audit.records().await.iter().map(|r| r.success).collect();
        assert_eq!(flags, vec![false, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_attempt() {
        let client = RetryingClient::new(policy(false), AuditLog::disabled());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError> = client
            .execute("q", None, &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_attempt_is_audited() {
        let audit = AuditLog::in_memory();
        let client = RetryingClient::new(policy(false), audit.clone());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let result: Result<(), RetryError> = client
            .execute("slow query", Some("wxyz"), &cancel, || async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        let records = audit.records().await;
        assert_eq!(records.len(), 1);
        assert!(!records[0].success);
        assert_eq!(records[0].query, "slow query");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_attempts() {
        let client = RetryingClient::new(policy(false), AuditLog::disabled());
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let result: Result<(), RetryError> = client
            .execute("q", None, &cancel, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Timeout) }
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
