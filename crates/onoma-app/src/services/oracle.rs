use std::time::Duration;

use async_trait::async_trait;
use governor::RateLimiter;
use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_RETRY_BASE_SECS, DEFAULT_RETRY_BUDGET};

pub type GenericRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// One queue record as submitted to the naming service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleItem {
    pub id: String,
    pub stem: String,
}

/// One inferred label triple as returned by the naming service. Entries are
/// matched back to records strictly by `id`; order is not significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleLabel {
    pub id: String,
    pub english: String,
    pub chinese: String,
    pub domain: String,
}

pub type OracleResult<T> = Result<T, OracleError>;

/// Failure taxonomy of the naming service.
///
/// A response missing an expected id is not an error here; the merge step
/// handles that per-record.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Rate-limited or temporarily unavailable; worth retrying.
    #[error("naming service unavailable: {0}")]
    Transient(String),
    /// Anything else, including malformed payloads and exhausted retries.
    #[error("naming service request failed: {0}")]
    Permanent(String),
    #[error("missing GOOGLE_AI_API_KEY or GEMINI_API_KEY environment variable")]
    MissingApiKey,
}

impl OracleError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Transient(_))
    }
}

/// Batched inference contract consumed by the orchestrator.
#[async_trait]
pub trait NamingOracle: Send + Sync {
    async fn infer(&self, items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>>;
}

/// Linear backoff schedule for transient naming failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_RETRY_BUDGET,
            base_delay: Duration::from_secs(DEFAULT_RETRY_BASE_SECS),
        }
    }
}

impl RetryPolicy {
    /// Wait before retry `attempt` (1-based): `attempt * base_delay`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Wraps a naming oracle with bounded retries for transient failures.
///
/// The schedule runs on the tokio clock, so tests drive it deterministically
/// under a paused runtime. An exhausted budget re-raises as a permanent
/// failure.
pub struct RetryingOracle<O> {
    inner: O,
    policy: RetryPolicy,
}

impl<O> RetryingOracle<O> {
    pub fn new(inner: O, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<O: NamingOracle> NamingOracle for RetryingOracle<O> {
    async fn infer(&self, items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
        let mut attempt = 0u32;
        loop {
            match self.inner.infer(items).await {
                Ok(labels) => return Ok(labels),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    if attempt > self.policy.max_retries {
                        return Err(OracleError::Permanent(format!(
                            "retry budget exhausted after {} retries: {err}",
                            self.policy.max_retries
                        )));
                    }
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "naming service throttled; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct FlakyOracle {
        calls: Arc<Mutex<u32>>,
        transient_failures: u32,
    }

    #[async_trait]
    impl NamingOracle for FlakyOracle {
        async fn infer(&self, _items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
            let mut calls = self.calls.lock().expect("call counter mutex poisoned");
            *calls += 1;
            if *calls <= self.transient_failures {
                Err(OracleError::Transient("quota exceeded".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    struct BrokenOracle {
        calls: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl NamingOracle for BrokenOracle {
        async fn infer(&self, _items: &[OracleItem]) -> OracleResult<Vec<OracleLabel>> {
            let mut calls = self.calls.lock().expect("call counter mutex poisoned");
            *calls += 1;
            Err(OracleError::Permanent("invalid request".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_linearly() {
        let calls = Arc::new(Mutex::new(0));
        let oracle = RetryingOracle::new(
            FlakyOracle {
                calls: calls.clone(),
                transient_failures: 2,
            },
            RetryPolicy::default(),
        );

        let started = tokio::time::Instant::now();
        let result = oracle.infer(&[]).await;

        assert!(result.is_ok(), "third attempt should succeed");
        assert_eq!(*calls.lock().expect("call counter mutex poisoned"), 3);
        assert_eq!(
            started.elapsed(),
            Duration::from_secs(3 + 6),
            "waits must follow the linear schedule"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_reraises_as_permanent() {
        let calls = Arc::new(Mutex::new(0));
        let oracle = RetryingOracle::new(
            FlakyOracle {
                calls: calls.clone(),
                transient_failures: u32::MAX,
            },
            RetryPolicy::default(),
        );

        let started = tokio::time::Instant::now();
        let err = oracle.infer(&[]).await.expect_err("budget must exhaust");

        assert!(!err.is_transient(), "exhausted budget is terminal");
        assert!(
            err.to_string().contains("retry budget exhausted"),
            "unexpected error: {err}"
        );
        assert_eq!(*calls.lock().expect("call counter mutex poisoned"), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(3 + 6 + 9));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failures_are_not_retried() {
        let calls = Arc::new(Mutex::new(0));
        let oracle = RetryingOracle::new(
            BrokenOracle {
                calls: calls.clone(),
            },
            RetryPolicy::default(),
        );

        let started = tokio::time::Instant::now();
        let err = oracle.infer(&[]).await.expect_err("permanent failure");

        assert!(!err.is_transient());
        assert_eq!(*calls.lock().expect("call counter mutex poisoned"), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
