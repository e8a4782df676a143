//! # Tally: counters over the event stream
//!
//! A metrics-style subscriber: counts runs and units by outcome. Reads are lock-free
//! snapshots of atomic counters.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::core::UnitStatus;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event counters.
#[derive(Default)]
pub struct Tally {
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
    runs_reset: AtomicU64,
    units_succeeded: AtomicU64,
    units_failed: AtomicU64,
    retries: AtomicU64,
    timeouts: AtomicU64,
}

/// Point-in-time copy of a [`Tally`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TallySnapshot {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub runs_reset: u64,
    pub units_succeeded: u64,
    pub units_failed: u64,
    pub retries: u64,
    pub timeouts: u64,
}

impl Tally {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TallySnapshot {
        TallySnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            runs_reset: self.runs_reset.load(Ordering::Relaxed),
            units_succeeded: self.units_succeeded.load(Ordering::Relaxed),
            units_failed: self.units_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
        }
    }

    fn counter(&self, ev: &Event) -> Option<&AtomicU64> {
        let counter = match (ev.kind, ev.status) {
            (EventKind::RunStarted, _) => &self.runs_started,
            (EventKind::RunCompleted, _) => &self.runs_completed,
            (EventKind::RunFailed, _) => &self.runs_failed,
            (EventKind::RunReset, _) => &self.runs_reset,
            (EventKind::UnitStatusChanged, Some(UnitStatus::Succeeded)) => &self.units_succeeded,
            (EventKind::UnitStatusChanged, Some(UnitStatus::Failed)) => &self.units_failed,
            (EventKind::RetryScheduled, _) => &self.retries,
            (EventKind::TimeoutHit, _) => &self.timeouts,
            _ => return None,
        };
        Some(counter)
    }
}

#[async_trait]
impl Subscribe for Tally {
    async fn on_event(&self, ev: &Event) {
        if let Some(counter) = self.counter(ev) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &'static str {
        "Tally"
    }

    /// Pending and Running churn is not counted, so it is not queued either.
    fn accepts(&self, ev: &Event) -> bool {
        self.counter(ev).is_some()
    }
}
