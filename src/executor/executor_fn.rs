//! # Function-backed executor (`ExecutorFn`)
//!
//! [`ExecutorFn`] wraps a closure `F: Fn(WorkUnit, u32, CancellationToken) -> Fut`,
//! producing a fresh future per attempt. Shared state, if any, must be captured
//! explicitly (e.g. an `Arc<AtomicU32>`).
//!
//! ## Example
//! ```rust
//! use num_bigint::BigUint;
//! use tokio_util::sync::CancellationToken;
//! use rangefold::{ExecutorFn, ExecutorRef, UnitError, WorkUnit};
//!
//! let exec: ExecutorRef = ExecutorFn::arc(
//!     "sum",
//!     |unit: WorkUnit, _attempt: u32, _ctx: CancellationToken| async move {
//!         Ok::<_, UnitError>(BigUint::from(unit.start() + unit.end()))
//!     },
//! );
//! assert_eq!(exec.name(), "sum");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tokio_util::sync::CancellationToken;

use crate::error::UnitError;
use crate::executor::Executor;
use crate::units::WorkUnit;

/// Function-backed executor implementation.
pub struct ExecutorFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> ExecutorFn<F> {
    /// Creates a new function-backed executor.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the executor and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Executor for ExecutorFn<F>
where
    F: Fn(WorkUnit, u32, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<BigUint, UnitError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        unit: WorkUnit,
        attempt: u32,
        ctx: CancellationToken,
    ) -> Result<BigUint, UnitError> {
        (self.f)(unit, attempt, ctx).await
    }
}
