//! Error types for telemetry retrieval and normalization.
//!
//! Every failure the query facade can surface is a [`TelemetryError`]. The
//! variants map onto four caller-visible categories (see [`ErrorKind`]):
//!
//! - **Validation**: malformed request coordinates (non-positive lap, unknown session name)
//! - **Session not found**: the upstream provider has no such year/round/session
//! - **Lap not found**: the session exists but the driver or lap does not
//! - **Upstream**: the provider was unreachable, timed out, or returned unparseable data
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use apexdata::TelemetryError;
//!
//! let error = TelemetryError::upstream("connection reset by peer");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```
//!
//! Errors are `Clone` so a single failed upstream fetch can be handed to every
//! caller that was coalesced onto it.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::types::SessionKey;

/// Result type alias for telemetry operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Boxed source error shared between coalesced waiters.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Main error type for telemetry operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("Session {key} not found")]
    SessionNotFound { key: SessionKey },

    #[error("Lap {lap} for driver '{driver}' not found in session {key}")]
    LapNotFound { key: SessionKey, driver: String, lap: u32 },

    #[error("Upstream request failed: {reason}")]
    Upstream {
        reason: String,
        #[source]
        source: Option<SharedSource>,
    },

    #[error("Upstream request timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    SessionNotFound,
    LapNotFound,
    Upstream,
    Config,
}

impl TelemetryError {
    /// Collapse the error into its caller-facing category.
    ///
    /// Timeouts and unparseable upstream payloads are upstream failures.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TelemetryError::Validation { .. } => ErrorKind::Validation,
            TelemetryError::SessionNotFound { .. } => ErrorKind::SessionNotFound,
            TelemetryError::LapNotFound { .. } => ErrorKind::LapNotFound,
            TelemetryError::Upstream { .. }
            | TelemetryError::Timeout { .. }
            | TelemetryError::Parse { .. } => ErrorKind::Upstream,
            TelemetryError::Config { .. } => ErrorKind::Config,
        }
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Upstream { .. } => true,
            TelemetryError::Timeout { .. } => true,
            TelemetryError::Parse { .. } => false,
            TelemetryError::Validation { .. } => false,
            TelemetryError::SessionNotFound { .. } => false,
            TelemetryError::LapNotFound { .. } => false,
            TelemetryError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Validation { .. } => vec![
                "Check the year, round and session name",
                "Lap numbers start at 1",
                "Driver identifiers are matched exactly",
            ],
            TelemetryError::SessionNotFound { .. } => vec![
                "Check the event schedule for that season",
                "Sprint sessions only exist at sprint weekends",
                "Data for a session is published after it completes",
            ],
            TelemetryError::LapNotFound { .. } => vec![
                "List the session laps to see which laps exist",
                "Check the driver abbreviation spelling",
            ],
            TelemetryError::Upstream { .. } => vec![
                "Verify the upstream provider URL is reachable",
                "Check upstream credentials",
                "Retry the request later",
            ],
            TelemetryError::Timeout { .. } => vec![
                "Increase the upstream timeout",
                "Check upstream provider health",
                "Retry the request later",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check provider wire format compatibility",
                "Verify source data integrity",
            ],
            TelemetryError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Verify environment variable overrides",
            ],
        }
    }

    /// Helper constructor for validation errors.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        TelemetryError::Validation { field, reason: reason.into() }
    }

    /// Helper constructor for upstream failures.
    pub fn upstream(reason: impl Into<String>) -> Self {
        TelemetryError::Upstream { reason: reason.into(), source: None }
    }

    /// Helper constructor for upstream failures with source.
    pub fn upstream_with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        TelemetryError::Upstream { reason: reason.into(), source: Some(Arc::new(source)) }
    }

    /// Helper constructor for unparseable upstream payloads.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TelemetryError::Config { reason: reason.into() }
    }
}

impl From<reqwest::Error> for TelemetryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TelemetryError::parse("upstream response body", err.to_string())
        } else {
            TelemetryError::upstream_with_source("HTTP transport error", err)
        }
    }
}

impl From<serde_json::Error> for TelemetryError {
    fn from(err: serde_json::Error) -> Self {
        TelemetryError::parse("session document", err.to_string())
    }
}
