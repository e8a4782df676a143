//! # Range-product executor.
//!
//! [`ProductExecutor`] computes `start × (start+1) × … × end` exactly with
//! [`BigUint`]. The multiplication runs on tokio's blocking pool so a large unit
//! never stalls the coordinator or the other executors.

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::One;
use tokio_util::sync::CancellationToken;

use crate::error::UnitError;
use crate::executor::{Executor, FaultPolicy, NoFaults};
use crate::units::WorkUnit;

/// Below this many factors a straight fold beats splitting.
const SPLIT_THRESHOLD: u64 = 32;

/// Exact product of every integer in `[start, end]`; `1` for an empty range.
///
/// Uses binary splitting so the operands of each multiplication stay balanced.
///
/// # Example
/// ```
/// use num_bigint::BigUint;
/// use rangefold::range_product;
///
/// assert_eq!(range_product(1, 10), BigUint::from(3_628_800u32));
/// assert_eq!(range_product(5, 4), BigUint::from(1u32));
/// ```
pub fn range_product(start: u64, end: u64) -> BigUint {
    if start > end {
        return BigUint::one();
    }
    if end - start < SPLIT_THRESHOLD {
        return (start..=end).fold(BigUint::one(), |acc, k| acc * k);
    }
    let mid = start + (end - start) / 2;
    range_product(start, mid) * range_product(mid + 1, end)
}

/// Executor computing the exact product of a unit's range.
pub struct ProductExecutor {
    faults: Arc<dyn FaultPolicy>,
}

impl ProductExecutor {
    /// Executor without fault injection.
    pub fn new() -> Self {
        Self {
            faults: Arc::new(NoFaults),
        }
    }

    /// Executor that consults `faults` before every attempt.
    pub fn with_faults(faults: Arc<dyn FaultPolicy>) -> Self {
        Self { faults }
    }
}

impl Default for ProductExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Executor for ProductExecutor {
    fn name(&self) -> &str {
        "product"
    }

    async fn execute(
        &self,
        unit: WorkUnit,
        attempt: u32,
        ctx: CancellationToken,
    ) -> Result<BigUint, UnitError> {
        let plan = self.faults.plan(&unit, attempt);

        if !plan.latency.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(plan.latency) => {}
                _ = ctx.cancelled() => return Err(UnitError::Canceled),
            }
        }
        if let Some(error) = plan.failure {
            return Err(UnitError::Fail { error });
        }
        if ctx.is_cancelled() {
            return Err(UnitError::Canceled);
        }

        let (start, end) = (unit.start(), unit.end());
        tokio::task::spawn_blocking(move || range_product(start, end))
            .await
            .map_err(|e| UnitError::Fatal {
                error: format!("product computation aborted: {e}"),
            })
    }
}
