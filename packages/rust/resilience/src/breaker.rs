//! Circuit breaker guarding a single external resource.
//!
//! ```text
//! CLOSED --(failures >= threshold)--> OPEN --(reset timeout elapsed)--> HALF_OPEN
//!   ^                                                                      |
//!   +------------------------------(trial succeeds)-----------------------+
//! ```
//!
//! A failed half-open trial is counted like any other failure; since the
//! counter is still at the threshold it re-opens the breaker immediately.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use placeseo_shared::CircuitOpenError;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = add_duration(*now, by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Config and status
// ---------------------------------------------------------------------------

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker. Must be positive.
    pub failure_threshold: u32,
    /// How long an open breaker rejects calls before allowing a trial.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        })
    }
}

/// Read-only snapshot of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerStatus {
    pub state: CircuitState,
    pub failure_count: u32,
    pub next_attempt: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CircuitBreaker
// ---------------------------------------------------------------------------

struct Inner {
    state: CircuitState,
    failure_count: u32,
    next_attempt: DateTime<Utc>,
    trial_in_flight: bool,
}

/// Failure-counting gate in front of one resource. Share it (e.g. in an
/// `Arc`) between every caller of that resource; counters are updated under
/// a lock that is never held across an `.await`.
pub struct CircuitBreaker {
    resource: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("resource", &self.resource)
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

impl CircuitBreaker {
    pub fn new(resource: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(resource, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        resource: impl Into<String>,
        config: BreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = BreakerConfig {
            failure_threshold: config.failure_threshold.max(1),
            ..config
        };
        let now = clock.now();
        Self {
            resource: resource.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failure_count: 0,
                next_attempt: now,
                trial_in_flight: false,
            }),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Run `operation` unless the breaker is open.
    ///
    /// An open breaker returns [`CircuitOpenError`] (converted into `E`)
    /// without invoking `operation`. Otherwise the operation's own result is
    /// returned unchanged after updating the failure counter.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<CircuitOpenError>,
    {
        let trial = self.admit().map_err(E::from)?;
        let _guard = trial.then(|| TrialGuard { breaker: self });

        let outcome = operation().await;
        match &outcome {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        outcome
    }

    /// Force the breaker closed and clear its counter.
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
        inner.next_attempt = now;
        inner.trial_in_flight = false;
        debug!(resource = %self.resource, "circuit breaker reset");
    }

    pub fn status(&self) -> BreakerStatus {
        let inner = self.lock();
        BreakerStatus {
            state: inner.state,
            failure_count: inner.failure_count,
            next_attempt: inner.next_attempt,
        }
    }

    /// Decide whether a call may proceed. `Ok(true)` marks the half-open trial.
    fn admit(&self) -> Result<bool, CircuitOpenError> {
        let now = self.clock.now();
        let mut inner = self.lock();

        match inner.state {
            CircuitState::Closed => Ok(false),
            CircuitState::Open if now < inner.next_attempt => Err(self.rejection(&inner)),
            CircuitState::Open => {
                inner.state = CircuitState::HalfOpen;
                inner.trial_in_flight = true;
                info!(resource = %self.resource, "circuit breaker HALF_OPEN, allowing trial call");
                Ok(true)
            }
            CircuitState::HalfOpen if inner.trial_in_flight => Err(self.rejection(&inner)),
            CircuitState::HalfOpen => {
                inner.trial_in_flight = true;
                Ok(true)
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(resource = %self.resource, "circuit breaker CLOSED after successful trial");
        }
        inner.state = CircuitState::Closed;
        inner.failure_count = 0;
    }

    fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.failure_count = inner.failure_count.saturating_add(1);

        if inner.failure_count >= self.config.failure_threshold {
            inner.state = CircuitState::Open;
            inner.next_attempt = add_duration(now, self.config.reset_timeout);
            warn!(
                resource = %self.resource,
                failures = inner.failure_count,
                next_attempt = %inner.next_attempt,
                "circuit breaker OPEN"
            );
        } else {
            debug!(
                resource = %self.resource,
                failures = inner.failure_count,
                threshold = self.config.failure_threshold,
                "call failed, breaker still {}", inner.state
            );
        }
    }

    fn rejection(&self, inner: &Inner) -> CircuitOpenError {
        CircuitOpenError {
            resource: self.resource.clone(),
            retry_at: inner.next_attempt,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the half-open trial marker even if the caller drops the future.
struct TrialGuard<'a> {
    breaker: &'a CircuitBreaker,
}

impl Drop for TrialGuard<'_> {
    fn drop(&mut self) {
        self.breaker.lock().trial_in_flight = false;
    }
}

fn add_duration(at: DateTime<Utc>, by: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
