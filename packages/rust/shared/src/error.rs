//! Error types for placeseo.
//!
//! Library crates use [`PlaceSeoError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::types::{StageName, Violation};

/// Returned by a circuit breaker that rejected a call without attempting it.
#[derive(Debug, Clone, thiserror::Error)]
#[error("circuit breaker for {resource} is OPEN; next attempt allowed at {retry_at}")]
pub struct CircuitOpenError {
    /// Name of the protected resource.
    pub resource: String,
    /// Earliest time at which the breaker lets a trial call through.
    pub retry_at: DateTime<Utc>,
}

/// Top-level error type for all placeseo operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaceSeoError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during collection.
    #[error("network error: {0}")]
    Network(String),

    /// JSON/HTML parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A referenced brand directory or artifact does not exist.
    #[error("{what} not found at {path:?}")]
    NotFound { what: String, path: PathBuf },

    /// Schema or data validation failure. `violations` lists every offending
    /// location; it is empty for plain validation messages.
    #[error("validation error: {message}")]
    Validation {
        message: String,
        violations: Vec<Violation>,
    },

    /// A circuit breaker rejected the call.
    #[error(transparent)]
    CircuitOpen(#[from] CircuitOpenError),

    /// Every retry attempt failed; wraps the last underlying error.
    #[error("gave up after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        source: Box<PlaceSeoError>,
    },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An external stage command ran but did not succeed.
    #[error("command `{command}` {status}")]
    External { command: String, status: String },

    /// A pipeline stage failed.
    #[error("stage `{stage}` failed: {source}")]
    Stage {
        stage: StageName,
        source: Box<PlaceSeoError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PlaceSeoError>;

impl PlaceSeoError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error without location details.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            violations: Vec::new(),
        }
    }

    /// Create a not-found error for a named thing at a path.
    pub fn not_found(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attribute an error to a pipeline stage.
    pub fn in_stage(self, stage: StageName) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage and retry wrappers.
    pub fn root_cause(&self) -> &PlaceSeoError {
        match self {
            Self::Stage { source, .. } | Self::RetryExhausted { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Every violation carried by this error or the error it wraps.
    pub fn violations(&self) -> &[Violation] {
        match self.root_cause() {
            Self::Validation { violations, .. } => violations,
            _ => &[],
        }
    }
}
