//! # Outcome of one executor attempt.

use std::time::Duration;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;

/// Result of one attempt on one [`WorkUnit`](crate::WorkUnit).
///
/// Produced exactly once per unit per attempt, always with the elapsed wall time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkResult {
    /// The unit's partial product.
    Success {
        unit_id: u32,
        #[serde(with = "decimal")]
        value: BigUint,
        elapsed: Duration,
    },
    /// The attempt failed.
    Failure {
        unit_id: u32,
        kind: FailureKind,
        message: String,
        elapsed: Duration,
    },
}

impl WorkResult {
    /// Id of the unit this result belongs to.
    pub fn unit_id(&self) -> u32 {
        match self {
            WorkResult::Success { unit_id, .. } | WorkResult::Failure { unit_id, .. } => *unit_id,
        }
    }

    /// Wall time spent on the attempt.
    pub fn elapsed(&self) -> Duration {
        match self {
            WorkResult::Success { elapsed, .. } | WorkResult::Failure { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkResult::Success { .. })
    }

    /// Partial value, if the attempt succeeded.
    pub fn value(&self) -> Option<&BigUint> {
        match self {
            WorkResult::Success { value, .. } => Some(value),
            WorkResult::Failure { .. } => None,
        }
    }
}

/// Serde adapter: big integers travel as decimal strings.
pub(crate) mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &BigUint, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(d)?;
        BigUint::parse_bytes(raw.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("not a decimal integer: {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let ok = WorkResult::Success {
            unit_id: 2,
            value: BigUint::from(12u32),
            elapsed: Duration::from_millis(3),
        };
        assert_eq!(ok.unit_id(), 2);
        assert_eq!(ok.value(), Some(&BigUint::from(12u32)));

        let err = WorkResult::Failure {
            unit_id: 4,
            kind: FailureKind::Timeout,
            message: "slow".into(),
            elapsed: Duration::from_millis(9),
        };
        assert!(!err.is_success());
        assert_eq!(err.elapsed(), Duration::from_millis(9));
        assert!(err.value().is_none());
    }
}
