//! # Run state machine.
//!
//! [`RunState`] is the complete record of one distribution run. It only changes
//! through the transition methods below, all called by the coordinator while it
//! holds its state lock:
//!
//! ```text
//!            begin()                 all units Succeeded        aggregate ok
//!   Idle ──────────────► Distributing ─────────────► Aggregating ──────────► Completed
//!    ▲                        │                           │
//!    │                        │ unit Failed               │ aggregate error
//!    │                        ▼                           ▼
//!    │                      Failed ◄──────────────────────┘
//!    │
//!    └──── reset() from any state
//! ```
//!
//! ## Rules
//! - Every run-scoped transition names the run it is for; a mismatched [`RunId`]
//!   is rejected as stale and leaves the state untouched.
//! - `final_value` is `Some` iff the status is `Completed`.
//! - Slots are kept in ascending unit id order.

use std::time::Instant;

use num_bigint::BigUint;
use thiserror::Error;

use crate::error::FailureKind;
use crate::units::{RunId, WorkResult, WorkUnit};

/// Run-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Idle,
    Distributing,
    Aggregating,
    Completed,
    Failed,
}

impl RunStatus {
    /// `true` for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    pub fn as_label(self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Distributing => "distributing",
            RunStatus::Aggregating => "aggregating",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }
}

/// Per-unit status as reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl UnitStatus {
    pub fn as_label(self) -> &'static str {
        match self {
            UnitStatus::Pending => "pending",
            UnitStatus::Running => "running",
            UnitStatus::Succeeded => "succeeded",
            UnitStatus::Failed => "failed",
        }
    }
}

/// One unit paired with its latest result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSlot {
    pub unit: WorkUnit,
    pub status: UnitStatus,
    /// Attempts started so far.
    pub attempts: u32,
    /// Latest result (a failed attempt that is being retried stays here until replaced).
    pub result: Option<WorkResult>,
}

/// Why a transition was refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub(crate) enum StateError {
    #[error("stale run {got}, current is {current:?}")]
    Stale { got: RunId, current: Option<RunId> },
    #[error("unit {unit} is not part of run {run}")]
    UnknownUnit { run: RunId, unit: u32 },
    #[error("cannot {action} while {status:?}")]
    Illegal {
        action: &'static str,
        status: RunStatus,
    },
}

/// Full record of one run's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    run: Option<RunId>,
    status: RunStatus,
    slots: Vec<UnitSlot>,
    final_value: Option<BigUint>,
    error_message: Option<String>,
    failure: Option<FailureKind>,
    failing_unit: Option<u32>,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::idle()
    }
}

impl RunState {
    /// The initial state.
    pub fn idle() -> Self {
        Self {
            run: None,
            status: RunStatus::Idle,
            slots: Vec::new(),
            final_value: None,
            error_message: None,
            failure: None,
            failing_unit: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn run(&self) -> Option<RunId> {
        self.run
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Slots in ascending unit id order.
    pub fn slots(&self) -> &[UnitSlot] {
        &self.slots
    }

    pub fn slot(&self, unit: u32) -> Option<&UnitSlot> {
        self.slots.iter().find(|s| s.unit.id() == unit)
    }

    /// Set iff the run completed.
    pub fn final_value(&self) -> Option<&BigUint> {
        self.final_value.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }

    pub fn failing_unit(&self) -> Option<u32> {
        self.failing_unit
    }

    /// Run duration: from `begin` until the run completed or failed, or until now
    /// while it is still in flight.
    pub fn elapsed(&self) -> Option<std::time::Duration> {
        let started = self.started_at?;
        Some(match self.finished_at {
            Some(finished) => finished.duration_since(started),
            None => started.elapsed(),
        })
    }

    /// `true` once every slot holds a successful result.
    pub fn all_succeeded(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(|s| s.status == UnitStatus::Succeeded)
    }

    // ---- transitions ----

    /// Starts `run` over `units`. Only legal from `Idle` or a terminal state.
    pub(crate) fn begin(&mut self, run: RunId, units: &[WorkUnit]) -> Result<(), StateError> {
        if !(self.status == RunStatus::Idle || self.status.is_terminal()) {
            return Err(StateError::Illegal {
                action: "begin",
                status: self.status,
            });
        }
        let mut slots: Vec<UnitSlot> = units
            .iter()
            .map(|unit| UnitSlot {
                unit: *unit,
                status: UnitStatus::Pending,
                attempts: 0,
                result: None,
            })
            .collect();
        slots.sort_by_key(|s| s.unit.id());

        *self = Self {
            run: Some(run),
            status: RunStatus::Distributing,
            slots,
            started_at: Some(Instant::now()),
            ..Self::idle()
        };
        Ok(())
    }

    /// Marks a new attempt on `unit` as running.
    pub(crate) fn mark_running(
        &mut self,
        run: RunId,
        unit: u32,
        attempt: u32,
    ) -> Result<(), StateError> {
        self.require(run, RunStatus::Distributing, "start attempt")?;
        let slot = self.slot_mut(run, unit)?;
        slot.status = UnitStatus::Running;
        slot.attempts = slot.attempts.max(attempt);
        Ok(())
    }

    /// Stores the result of an attempt that will be retried; the unit stays `Running`.
    pub(crate) fn record_retry(&mut self, run: RunId, result: WorkResult) -> Result<(), StateError> {
        self.require(run, RunStatus::Distributing, "record retry")?;
        let slot = self.slot_mut(run, result.unit_id())?;
        slot.result = Some(result);
        Ok(())
    }

    /// Stores a unit's final result and returns its new status.
    pub(crate) fn record(&mut self, run: RunId, result: WorkResult) -> Result<UnitStatus, StateError> {
        self.require(run, RunStatus::Distributing, "record result")?;
        let slot = self.slot_mut(run, result.unit_id())?;
        slot.status = if result.is_success() {
            UnitStatus::Succeeded
        } else {
            UnitStatus::Failed
        };
        slot.result = Some(result);
        Ok(slot.status)
    }

    /// `Distributing → Aggregating`; requires every unit to have succeeded.
    pub(crate) fn begin_aggregation(&mut self, run: RunId) -> Result<(), StateError> {
        self.require(run, RunStatus::Distributing, "aggregate")?;
        if !self.all_succeeded() {
            return Err(StateError::Illegal {
                action: "aggregate with unfinished units",
                status: self.status,
            });
        }
        self.status = RunStatus::Aggregating;
        Ok(())
    }

    /// `Aggregating → Completed`.
    pub(crate) fn complete(&mut self, run: RunId, value: BigUint) -> Result<(), StateError> {
        self.require(run, RunStatus::Aggregating, "complete")?;
        self.status = RunStatus::Completed;
        self.final_value = Some(value);
        self.finished_at = Some(Instant::now());
        Ok(())
    }

    /// `Distributing | Aggregating → Failed`.
    pub(crate) fn fail(
        &mut self,
        run: RunId,
        unit: Option<u32>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Result<(), StateError> {
        self.check_run(run)?;
        if !matches!(self.status, RunStatus::Distributing | RunStatus::Aggregating) {
            return Err(StateError::Illegal {
                action: "fail",
                status: self.status,
            });
        }
        self.status = RunStatus::Failed;
        self.final_value = None;
        self.error_message = Some(message.into());
        self.failure = Some(kind);
        self.failing_unit = unit;
        self.finished_at = Some(Instant::now());
        Ok(())
    }

    /// Back to `Idle` from anywhere.
    pub(crate) fn reset(&mut self) {
        *self = Self::idle();
    }

    // ---- helpers ----

    fn check_run(&self, run: RunId) -> Result<(), StateError> {
        if self.run == Some(run) {
            Ok(())
        } else {
            Err(StateError::Stale {
                got: run,
                current: self.run,
            })
        }
    }

    fn require(&self, run: RunId, status: RunStatus, action: &'static str) -> Result<(), StateError> {
        self.check_run(run)?;
        if self.status != status {
            return Err(StateError::Illegal {
                action,
                status: self.status,
            });
        }
        Ok(())
    }

    fn slot_mut(&mut self, run: RunId, unit: u32) -> Result<&mut UnitSlot, StateError> {
        self.slots
            .iter_mut()
            .find(|s| s.unit.id() == unit)
            .ok_or(StateError::UnknownUnit { run, unit })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::partition;
    use std::time::Duration;

    fn success(unit: u32, value: u64) -> WorkResult {
        WorkResult::Success {
            unit_id: unit,
            value: BigUint::from(value),
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn happy_path_transitions() {
        let mut state = RunState::idle();
        let run = RunId::from_raw(1);
        state.begin(run, &partition(4, 2).unwrap()).unwrap();
        assert_eq!(state.status(), RunStatus::Distributing);
        assert!(state.slots().iter().all(|s| s.status == UnitStatus::Pending));

        state.mark_running(run, 1, 1).unwrap();
        state.record(run, success(1, 2)).unwrap();
        assert!(!state.all_succeeded());
        state.record(run, success(2, 12)).unwrap();
        assert!(state.all_succeeded());

        state.begin_aggregation(run).unwrap();
        state.complete(run, BigUint::from(24u32)).unwrap();
        assert_eq!(state.status(), RunStatus::Completed);
        assert_eq!(state.final_value(), Some(&BigUint::from(24u32)));
    }

    #[test]
    fn failure_clears_final_value_and_records_reason() {
        let mut state = RunState::idle();
        let run = RunId::from_raw(2);
        state.begin(run, &partition(10, 4).unwrap()).unwrap();
        state
            .fail(run, Some(2), FailureKind::Executor, "unit 2 failed: boom")
            .unwrap();
        assert_eq!(state.status(), RunStatus::Failed);
        assert!(state.final_value().is_none());
        assert_eq!(state.failing_unit(), Some(2));
        assert_eq!(state.error_message(), Some("unit 2 failed: boom"));
        assert!(state.complete(run, BigUint::from(1u32)).is_err());
    }

    #[test]
    fn elapsed_stops_at_terminal_state() {
        let mut state = RunState::idle();
        let run = RunId::from_raw(7);
        assert!(state.elapsed().is_none());
        state.begin(run, &partition(3, 3).unwrap()).unwrap();
        state
            .fail(run, Some(1), FailureKind::Executor, "unit 1 failed: boom")
            .unwrap();

        let frozen = state.elapsed().unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(state.elapsed(), Some(frozen));
    }

    #[test]
    fn stale_results_do_not_touch_new_run() {
        let mut state = RunState::idle();
        let old = RunId::from_raw(10);
        let new = RunId::from_raw(11);
        state.begin(old, &partition(10, 4).unwrap()).unwrap();
        state.reset();
        state.begin(new, &partition(10, 4).unwrap()).unwrap();
        let before = state.clone();

        let err = state.record(old, success(1, 2)).unwrap_err();
        assert!(matches!(err, StateError::Stale { .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn reset_twice_is_idle() {
        let mut state = RunState::idle();
        state
            .begin(RunId::from_raw(3), &partition(5, 2).unwrap())
            .unwrap();
        state.reset();
        assert_eq!(state, RunState::idle());
        state.reset();
        assert_eq!(state, RunState::idle());
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let mut state = RunState::idle();
        let run = RunId::from_raw(4);
        state.begin(run, &partition(3, 3).unwrap()).unwrap();
        assert!(matches!(
            state.record(run, success(9, 1)),
            Err(StateError::UnknownUnit { unit: 9, .. })
        ));
    }

    #[test]
    fn cannot_begin_while_distributing() {
        let mut state = RunState::idle();
        state
            .begin(RunId::from_raw(5), &partition(3, 3).unwrap())
            .unwrap();
        assert!(state
            .begin(RunId::from_raw(6), &partition(3, 3).unwrap())
            .is_err());
    }
}
