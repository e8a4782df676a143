//! # Retry policy for failed units.
//!
//! [`RetryPolicy`] decides whether a unit that failed gets another attempt.
//!
//! ```text
//! RetryPolicy::Never                       → first failure fails the run (default)
//! RetryPolicy::OnFailure { max_attempts }  → retryable errors are retried until
//!                                            `max_attempts` attempts were made
//! ```
//!
//! Only errors with [`UnitError::is_retryable`] (execution failure, timeout) are retried;
//! fatal errors and cancellation always end the unit.

use crate::error::UnitError;

/// Policy controlling whether a failed unit is attempted again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Fail fast: the first failure is final.
    #[default]
    Never,
    /// Retry retryable failures.
    ///   - `max_attempts`: total attempts including the first (values below 1 act as 1).
    OnFailure { max_attempts: u32 },
}

impl RetryPolicy {
    /// Returns `true` if another attempt should follow `attempt` (1-based) failing with `err`.
    ///
    /// # Example
    /// ```
    /// use rangefold::{RetryPolicy, UnitError};
    ///
    /// let policy = RetryPolicy::OnFailure { max_attempts: 3 };
    /// let err = UnitError::Fail { error: "flaky".into() };
    /// assert!(policy.allows(1, &err));
    /// assert!(policy.allows(2, &err));
    /// assert!(!policy.allows(3, &err));
    /// assert!(!RetryPolicy::Never.allows(1, &err));
    /// ```
    pub fn allows(&self, attempt: u32, err: &UnitError) -> bool {
        match self {
            RetryPolicy::Never => false,
            RetryPolicy::OnFailure { max_attempts } => {
                err.is_retryable() && attempt < (*max_attempts).max(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_retries_fatal_or_canceled() {
        let policy = RetryPolicy::OnFailure { max_attempts: 10 };
        assert!(!policy.allows(1, &UnitError::Fatal { error: "x".into() }));
        assert!(!policy.allows(1, &UnitError::Canceled));
    }

    #[test]
    fn zero_attempts_acts_as_one() {
        let policy = RetryPolicy::OnFailure { max_attempts: 0 };
        assert!(!policy.allows(1, &UnitError::Fail { error: "x".into() }));
    }

    #[test]
    fn default_is_fail_fast() {
        assert_eq!(RetryPolicy::default(), RetryPolicy::Never);
    }
}
