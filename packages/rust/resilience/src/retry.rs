//! Retry with backoff.
//!
//! A [`RetryPolicy`] re-invokes an async operation until it succeeds, the
//! attempt budget runs out, or the error says retrying is pointless. The last
//! error is returned as-is; callers that want a "gave up" wrapper add it
//! themselves (the collector maps it to `PlaceSeoError::RetryExhausted`).

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use placeseo_shared::PlaceSeoError;

/// Whether a failure is worth another attempt.
pub trait RetryDecision {
    fn is_retryable(&self) -> bool;
}

impl RetryDecision for PlaceSeoError {
    fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PlaceSeoError::CircuitOpen(_)
                | PlaceSeoError::NotFound { .. }
                | PlaceSeoError::Validation { .. }
                | PlaceSeoError::Config { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `base * 2^(k-1)` after the k-th failure.
    Exponential,
    /// `base` after every failure.
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Exponential,
        }
    }

    pub fn linear(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff: Backoff::Linear,
        }
    }

    /// Delay to wait after `failed` attempts have failed (1-based).
    pub fn delay_for(&self, failed: u32) -> Duration {
        match self.backoff {
            Backoff::Linear => self.base_delay,
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(failed.saturating_sub(1)).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Run `operation` under this policy. `name` only labels log lines.
    pub async fn run<T, E, F, Fut>(&self, name: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryDecision + Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if attempt > 1 {
                tracing::debug!(operation = name, attempt, "retrying");
            }

            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::debug!(operation = name, attempt, error = %err, "not retryable");
                return Err(err);
            }

            if attempt >= max_attempts {
                tracing::error!(
                    operation = name,
                    attempts = attempt,
                    error = %err,
                    "operation failed, retries exhausted"
                );
                return Err(err);
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                operation = name,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// Run `operation` with exponential backoff.
pub async fn exponential_backoff<T, E, F, Fut>(
    name: &str,
    max_attempts: u32,
    base_delay: Duration,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryDecision + Display,
{
    RetryPolicy::exponential(max_attempts, base_delay)
        .run(name, operation)
        .await
}

/// Run `operation` with a constant delay between attempts.
pub async fn linear_backoff<T, E, F, Fut>(
    name: &str,
    max_attempts: u32,
    base_delay: Duration,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryDecision + Display,
{
    RetryPolicy::linear(max_attempts, base_delay)
        .run(name, operation)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    use chrono::Utc;
    use tokio::time::Instant;

    use crate::breaker::{BreakerConfig, CircuitBreaker, ManualClock};

    /// Records the (paused) tokio time of every invocation.
    fn recorder() -> Arc<Mutex<Vec<Instant>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn gaps(calls: &[Instant]) -> Vec<Duration> {
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn delay_schedule() {
        let exp = RetryPolicy::exponential(5, Duration::from_millis(1000));
        assert_eq!(exp.delay_for(1), Duration::from_millis(1000));
        assert_eq!(exp.delay_for(2), Duration::from_millis(2000));
        assert_eq!(exp.delay_for(3), Duration::from_millis(4000));

        let lin = RetryPolicy::linear(5, Duration::from_millis(250));
        assert_eq!(lin.delay_for(1), lin.delay_for(4));
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let exp = RetryPolicy::exponential(100, Duration::from_secs(1));
        assert!(exp.delay_for(64) >= exp.delay_for(32));
    }

    #[tokio::test(start_paused = true)]
    async fn exponential_waits_then_returns_original_error() {
        let calls = recorder();
        let started = Instant::now();

        let result: Result<(), PlaceSeoError> =
            exponential_backoff("fetch", 3, Duration::from_millis(1000), || {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(Instant::now());
                    Err(PlaceSeoError::Network("connection reset".into()))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, PlaceSeoError::Network(ref m) if m == "connection reset"));

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            gaps(&calls),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        // no sleep after the final failure
        assert_eq!(Instant::now() - started, Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn linear_uses_constant_delay() {
        let calls = recorder();

        let result: Result<(), PlaceSeoError> =
            linear_backoff("fetch", 4, Duration::from_millis(500), || {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(Instant::now());
                    Err(PlaceSeoError::Network("503".into()))
                }
            })
            .await;

        assert!(result.is_err());
        let calls = calls.lock().unwrap();
        assert_eq!(gaps(&calls), vec![Duration::from_millis(500); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_first_success() {
        let calls = recorder();

        let value = RetryPolicy::exponential(5, Duration::from_millis(100))
            .run("fetch", || {
                let calls = calls.clone();
                async move {
                    let mut calls = calls.lock().unwrap();
                    calls.push(Instant::now());
                    if calls.len() < 2 {
                        Err(PlaceSeoError::Network("flaky".into()))
                    } else {
                        Ok(calls.len())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_errors_return_immediately() {
        let calls = recorder();
        let started = Instant::now();

        let result: Result<(), PlaceSeoError> = RetryPolicy::default()
            .run("fetch", || {
                let calls = calls.clone();
                async move {
                    calls.lock().unwrap().push(Instant::now());
                    Err(PlaceSeoError::not_found("place", "/place/0"))
                }
            })
            .await;

        assert!(matches!(result, Err(PlaceSeoError::NotFound { .. })));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn open_breaker_exhausts_outer_retry_at_once() {
        let breaker = CircuitBreaker::with_clock(
            "place-page",
            BreakerConfig {
                failure_threshold: 1,
                reset_timeout: Duration::from_secs(60),
            },
            Arc::new(ManualClock::new(Utc::now())),
        );
        let calls = recorder();
        let started = Instant::now();

        let result: Result<(), PlaceSeoError> = RetryPolicy::exponential(5, Duration::from_secs(1))
            .run("fetch", || {
                let calls = calls.clone();
                let breaker = &breaker;
                async move {
                    breaker
                        .execute(|| async {
                            calls.lock().unwrap().push(Instant::now());
                            Err(PlaceSeoError::Network("down".into()))
                        })
                        .await
                }
            })
            .await;

        // first attempt trips the breaker, the second is rejected and not retried
        assert!(matches!(result, Err(PlaceSeoError::CircuitOpen(_))));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(Instant::now() - started, Duration::from_secs(1));
    }
}
