//! Fault tolerance for calls that leave the process.
//!
//! This crate provides:
//! - [`CircuitBreaker`]: stops calling a resource after repeated failures
//! - [`RetryPolicy`]: re-invokes a failing operation with exponential or linear backoff
//!
//! The two compose in either order. The collector wraps a retry loop in a
//! breaker, so an exhausted retry series counts as one breaker failure, and
//! an open breaker is never retried (see [`RetryDecision`]).

pub mod breaker;
pub mod retry;

pub use breaker::{
    BreakerConfig, BreakerStatus, CircuitBreaker, CircuitState, Clock, ManualClock, SystemClock,
};
pub use retry::{Backoff, RetryDecision, RetryPolicy, exponential_backoff, linear_backoff};
