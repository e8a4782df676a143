//! # Handle to a started run.

use num_bigint::BigUint;
use tokio::sync::oneshot;

use crate::error::FailureKind;
use crate::units::RunId;

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFailure {
    pub kind: FailureKind,
    /// Failing unit, absent for run-wide failures.
    pub unit: Option<u32>,
    pub message: String,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every unit succeeded; the folded product.
    Completed(BigUint),
    /// A unit (or the aggregation) failed.
    Failed(RunFailure),
    /// The run was reset, or the coordinator went away, before it finished.
    Cancelled,
}

impl RunOutcome {
    /// Final value, if the run completed.
    pub fn value(&self) -> Option<&BigUint> {
        match self {
            RunOutcome::Completed(v) => Some(v),
            _ => None,
        }
    }
}

/// Returned by [`Coordinator::start`](crate::Coordinator::start).
///
/// Dropping the handle does not affect the run.
#[derive(Debug)]
pub struct RunHandle {
    run: RunId,
    outcome: oneshot::Receiver<RunOutcome>,
}

impl RunHandle {
    pub(crate) fn new(run: RunId, outcome: oneshot::Receiver<RunOutcome>) -> Self {
        Self { run, outcome }
    }

    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// Waits for the run to finish.
    pub async fn wait(self) -> RunOutcome {
        self.outcome.await.unwrap_or(RunOutcome::Cancelled)
    }
}
