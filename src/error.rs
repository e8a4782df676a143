//! Error types used by the rangefold coordinator and executors.
//!
//! This module defines the error taxonomy of a distribution run:
//!
//! - [`CoordinatorError`]: synchronous errors returned by [`Coordinator::start`](crate::Coordinator::start)
//!   before any work is dispatched.
//! - [`UnitError`]: errors raised by a single executor attempt.
//! - [`AggregationError`]: invariant violations found while folding partial values.
//! - [`FailureKind`]: the compact classification recorded in a failed [`WorkResult`](crate::WorkResult)
//!   and in run-level failure events.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::RunId;

/// # Errors returned synchronously by the coordinator.
///
/// These are raised before a run transitions out of `Idle`; no events are published for them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// Input rejected before any work started (bad `n`, bad worker count).
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was wrong with the input.
        reason: String,
    },

    /// A run is still distributing or aggregating; call `reset()` first.
    #[error("run {run} is still in progress")]
    RunInProgress {
        /// The run that is currently active.
        run: RunId,
    },
}

impl CoordinatorError {
    /// Shorthand for [`CoordinatorError::InvalidInput`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        CoordinatorError::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rangefold::CoordinatorError;
    ///
    /// let err = CoordinatorError::invalid("n must be >= 1");
    /// assert_eq!(err.as_label(), "invalid_input");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CoordinatorError::InvalidInput { .. } => "invalid_input",
            CoordinatorError::RunInProgress { .. } => "run_in_progress",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CoordinatorError::InvalidInput { reason } => format!("invalid input: {reason}"),
            CoordinatorError::RunInProgress { run } => format!("run {run} still in progress"),
        }
    }
}

/// # Errors produced by one executor attempt.
///
/// Some errors are retryable (`Timeout`, `Fail`), others are considered fatal.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    /// Attempt exceeded the configured per-unit timeout.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error (never retried).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Attempt failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Attempt was abandoned because its run was cancelled.
    #[error("run cancelled")]
    Canceled,
}

impl UnitError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rangefold::UnitError;
    /// use std::time::Duration;
    ///
    /// let err = UnitError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "unit_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            UnitError::Timeout { .. } => "unit_timeout",
            UnitError::Fatal { .. } => "unit_fatal",
            UnitError::Fail { .. } => "unit_failed",
            UnitError::Canceled => "unit_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            UnitError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            UnitError::Fatal { error } => format!("fatal: {error}"),
            UnitError::Fail { error } => format!("error: {error}"),
            UnitError::Canceled => "run cancelled".to_string(),
        }
    }

    /// Indicates whether another attempt may succeed.
    ///
    /// Returns `true` for [`UnitError::Fail`] and [`UnitError::Timeout`], `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use rangefold::UnitError;
    ///
    /// assert!(UnitError::Fail { error: "boom".into() }.is_retryable());
    /// assert!(!UnitError::Fatal { error: "nope".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, UnitError::Fail { .. } | UnitError::Timeout { .. })
    }

    /// Maps the error onto the failure classification stored in a [`WorkResult`](crate::WorkResult).
    pub fn kind(&self) -> FailureKind {
        match self {
            UnitError::Timeout { .. } => FailureKind::Timeout,
            UnitError::Fatal { .. } | UnitError::Fail { .. } => FailureKind::Executor,
            UnitError::Canceled => FailureKind::Cancelled,
        }
    }
}

/// # Invariant violations found while folding partial values.
///
/// Unreachable given well-formed results, but handled rather than assumed impossible.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    /// A unit reached aggregation without a successful partial value.
    #[error("unit {unit} has no successful partial value")]
    MissingPartial {
        /// Unit id.
        unit: u32,
    },

    /// A partial value that cannot be a product of positive integers.
    #[error("unit {unit} reported a malformed partial value: {detail}")]
    MalformedPartial {
        /// Unit id.
        unit: u32,
        /// What is wrong with it.
        detail: String,
    },

    /// A result slot holds a result for a different unit.
    #[error("slot for unit {expected} holds a result for unit {found}")]
    UnitMismatch {
        /// Unit id the slot belongs to.
        expected: u32,
        /// Unit id the result names.
        found: u32,
    },
}

impl AggregationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            AggregationError::MissingPartial { .. } => "aggregation_missing_partial",
            AggregationError::MalformedPartial { .. } => "aggregation_malformed_partial",
            AggregationError::UnitMismatch { .. } => "aggregation_unit_mismatch",
        }
    }

    /// Unit the violation was found on.
    pub fn unit(&self) -> u32 {
        match self {
            AggregationError::MissingPartial { unit }
            | AggregationError::MalformedPartial { unit, .. } => *unit,
            AggregationError::UnitMismatch { expected, .. } => *expected,
        }
    }
}

/// Classification of a failed unit or run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The executor reported an error.
    Executor,
    /// The unit exceeded its timeout.
    Timeout,
    /// Combining partial values violated an invariant.
    Aggregation,
    /// The run was cancelled before the unit finished.
    Cancelled,
}

impl FailureKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use rangefold::FailureKind;
    ///
    /// assert_eq!(FailureKind::Timeout.as_label(), "timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureKind::Executor => "executor",
            FailureKind::Timeout => "timeout",
            FailureKind::Aggregation => "aggregation",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}
