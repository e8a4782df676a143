//! # Executor abstraction.
//!
//! An executor computes the partial value of one [`WorkUnit`]. It receives a
//! [`CancellationToken`] that fires when the run is reset, the run failed elsewhere,
//! or the attempt timed out; long computations should honor it.

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio_util::sync::CancellationToken;

use crate::error::UnitError;
use crate::units::WorkUnit;

/// # Asynchronous, cancelable unit computation.
///
/// Executors share no mutable state with each other through the coordinator; each
/// attempt gets its own copy of the unit and its own token.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use num_bigint::BigUint;
/// use tokio_util::sync::CancellationToken;
/// use rangefold::{Executor, UnitError, WorkUnit};
///
/// struct Ones;
///
/// #[async_trait]
/// impl Executor for Ones {
///     fn name(&self) -> &str { "ones" }
///
///     async fn execute(
///         &self,
///         _unit: WorkUnit,
///         _attempt: u32,
///         ctx: CancellationToken,
///     ) -> Result<BigUint, UnitError> {
///         if ctx.is_cancelled() {
///             return Err(UnitError::Canceled);
///         }
///         Ok(BigUint::from(1u32))
///     }
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync + 'static {
    /// Returns a stable, human-readable executor name.
    fn name(&self) -> &str;

    /// Computes the partial value of `unit`; `attempt` starts at 1.
    async fn execute(
        &self,
        unit: WorkUnit,
        attempt: u32,
        ctx: CancellationToken,
    ) -> Result<BigUint, UnitError>;
}

/// Shared handle to an executor.
pub type ExecutorRef = Arc<dyn Executor>;
