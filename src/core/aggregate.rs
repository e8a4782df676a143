//! # Folding partial values into the final product.
//!
//! Partials are multiplied in ascending unit id order, whatever order the results
//! arrived in. Every slot must hold a successful result for its own unit, and no
//! partial can be zero (a product of positive integers never is).

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::core::state::UnitSlot;
use crate::error::AggregationError;
use crate::units::WorkResult;

/// Multiplies the partial values of `slots` in ascending unit id order.
pub(crate) fn aggregate(slots: &[UnitSlot]) -> Result<BigUint, AggregationError> {
    let mut ordered: Vec<&UnitSlot> = slots.iter().collect();
    ordered.sort_by_key(|s| s.unit.id());

    let mut acc = BigUint::one();
    for slot in ordered {
        let expected = slot.unit.id();
        let value = match &slot.result {
            Some(WorkResult::Success { unit_id, value, .. }) => {
                if *unit_id != expected {
                    return Err(AggregationError::UnitMismatch {
                        expected,
                        found: *unit_id,
                    });
                }
                value
            }
            Some(WorkResult::Failure { .. }) | None => {
                return Err(AggregationError::MissingPartial { unit: expected });
            }
        };
        if value.is_zero() {
            return Err(AggregationError::MalformedPartial {
                unit: expected,
                detail: "partial value is zero".into(),
            });
        }
        acc *= value;
    }
    Ok(acc)
}
