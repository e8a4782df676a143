//! # Run a single attempt of a unit.
//!
//! Executes one attempt of a [`WorkUnit`] on an [`Executor`] with an optional timeout
//! and measures how long it took.
//!
//! ```text
//! Success:   executor.execute() → Ok(value)          → Attempt { Ok(value) }
//! Failure:   executor.execute() → Err(Fail/Fatal)    → Attempt { Err(..) }
//! Panic:     executor.execute() panics               → Attempt { Err(Fatal) }
//! Timeout:   timeout exceeded   → cancel child token → Attempt { Err(Timeout) }
//! ```
//!
//! ## Rules
//! - Derives a **child token** per attempt; cancelling it never affects the run token
//! - Elapsed time is measured for every outcome
//! - A panicking executor is reported as a fatal error, not propagated

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use num_bigint::BigUint;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::{FailureKind, UnitError};
use crate::executor::Executor;
use crate::units::{WorkResult, WorkUnit};

/// Outcome of one attempt.
#[derive(Debug)]
pub(crate) struct Attempt {
    pub unit_id: u32,
    pub elapsed: Duration,
    pub outcome: Result<BigUint, UnitError>,
}

impl Attempt {
    /// Converts the attempt into the result recorded in the run state.
    pub fn to_result(&self) -> WorkResult {
        match &self.outcome {
            Ok(value) => WorkResult::Success {
                unit_id: self.unit_id,
                value: value.clone(),
                elapsed: self.elapsed,
            },
            Err(err) => WorkResult::Failure {
                unit_id: self.unit_id,
                kind: err.kind(),
                message: failure_message(err),
                elapsed: self.elapsed,
            },
        }
    }
}

fn failure_message(err: &UnitError) -> String {
    match err {
        UnitError::Fail { error } | UnitError::Fatal { error } => error.clone(),
        UnitError::Timeout { timeout } => format!("timed out after {timeout:?}"),
        UnitError::Canceled => FailureKind::Cancelled.as_label().to_string(),
    }
}

/// Executes a single attempt of `unit` on `executor`.
///
/// If `timeout` is `Some(dur)` and `dur > 0` the execution is wrapped in
/// `tokio::time::timeout`; on expiry the child token is cancelled and the attempt
/// ends with [`UnitError::Timeout`].
pub(crate) async fn run_once(
    executor: &dyn Executor,
    unit: WorkUnit,
    attempt: u32,
    parent: &CancellationToken,
    timeout: Option<Duration>,
) -> Attempt {
    let child = parent.child_token();
    let started = Instant::now();
    let fut = AssertUnwindSafe(executor.execute(unit, attempt, child.clone())).catch_unwind();

    let caught = if let Some(dur) = timeout.filter(|d| *d > Duration::ZERO) {
        match time::timeout(dur, fut).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                Ok(Err(UnitError::Timeout { timeout: dur }))
            }
        }
    } else {
        fut.await
    };

    let outcome = caught.unwrap_or_else(|panic| {
        Err(UnitError::Fatal {
            error: format!("executor panicked: {}", panic_message(&*panic)),
        })
    });

    Attempt {
        unit_id: unit.id(),
        elapsed: started.elapsed(),
        outcome,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutorFn;

    fn unit() -> WorkUnit {
        WorkUnit::new(1, 1, 5).unwrap()
    }

    #[tokio::test]
    async fn success_carries_value() {
        let exec = ExecutorFn::new(
            "ok",
            |unit: WorkUnit, _attempt: u32, _ctx: CancellationToken| async move {
                Ok::<_, UnitError>(crate::executor::range_product(unit.start(), unit.end()))
            },
        );
        let attempt = run_once(&exec, unit(), 1, &CancellationToken::new(), None).await;
        assert_eq!(attempt.outcome, Ok(BigUint::from(120u32)));
        assert!(attempt.to_result().is_success());
    }

    #[tokio::test]
    async fn timeout_cancels_child_only() {
        let exec = ExecutorFn::new(
            "slow",
            |_unit: WorkUnit, _attempt: u32, ctx: CancellationToken| async move {
                ctx.cancelled().await;
                Err::<BigUint, _>(UnitError::Canceled)
            },
        );
        let parent = CancellationToken::new();
        let attempt = run_once(&exec, unit(), 1, &parent, Some(Duration::from_millis(20))).await;
        assert!(matches!(attempt.outcome, Err(UnitError::Timeout { .. })));
        assert!(!parent.is_cancelled());
        match attempt.to_result() {
            WorkResult::Failure { kind, .. } => assert_eq!(kind, FailureKind::Timeout),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn panic_becomes_fatal() {
        let exec = ExecutorFn::new(
            "panics",
            |_unit: WorkUnit, _attempt: u32, _ctx: CancellationToken| async move {
                if true {
                    panic!("kaboom");
                }
                Ok::<_, UnitError>(BigUint::from(1u32))
            },
        );
        let attempt = run_once(&exec, unit(), 1, &CancellationToken::new(), None).await;
        match attempt.outcome {
            Err(UnitError::Fatal { error }) => assert!(error.contains("kaboom")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
