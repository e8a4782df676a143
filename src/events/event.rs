//! # Events emitted while a distribution run progresses.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Run events**: run-level lifecycle (started, failed, completed, reset)
//! - **Unit events**: per-unit status changes, timeouts, scheduled retries
//! - **Subscriber events**: delivery problems inside the fan-out (overflow, panic)
//!
//! The [`Event`] struct carries metadata such as timestamps, run id, unit id,
//! status, partial/final values and failure details.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! The coordinator publishes while holding its state lock, so for one run `seq` order
//! is the order in which the run state was mutated.
//!
//! ## Example
//! ```rust
//! use rangefold::{Event, EventKind, UnitStatus};
//!
//! let ev = Event::new(EventKind::UnitStatusChanged)
//!     .with_unit(2)
//!     .with_status(UnitStatus::Failed)
//!     .with_reason("worker 2 encountered an error");
//!
//! assert_eq!(ev.unit, Some(2));
//! assert_eq!(ev.status, Some(UnitStatus::Failed));
//! assert_eq!(ev.reason.as_deref(), Some("worker 2 encountered an error"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::UnitStatus;
use crate::error::FailureKind;
use crate::units::RunId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of run events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: "full" or "closed"
    SubscriberOverflow,

    // === Run events ===
    /// A run was accepted and its units are about to be dispatched.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `unit_count`: number of units
    RunStarted,

    /// The run failed; no final value will be produced.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `reason`: failure description
    /// - `unit`: failing unit (absent for run-wide failures)
    /// - `failure`: failure classification
    RunFailed,

    /// All units succeeded and the partials were folded.
    ///
    /// Sets:
    /// - `run`: run id
    /// - `value`: final value as a decimal string
    /// - `elapsed`: time since the run started
    RunCompleted,

    /// A non-idle run was discarded by `reset()`.
    ///
    /// Sets:
    /// - `run`: run id of the discarded run
    RunReset,

    // === Unit events ===
    /// A unit changed status (`Pending` on dispatch, `Running` per attempt,
    /// then `Succeeded` or `Failed`).
    ///
    /// Sets:
    /// - `run`, `unit`, `status`
    /// - `attempt`: attempt number (`Running` and terminal statuses)
    /// - `value`: partial value (`Succeeded` only)
    /// - `elapsed`: attempt wall time (terminal statuses)
    /// - `reason`, `failure`: (`Failed` only)
    UnitStatusChanged,

    /// A unit attempt exceeded its timeout (always followed by its `Failed` status
    /// or a `RetryScheduled`).
    ///
    /// Sets:
    /// - `run`, `unit`, `attempt`
    /// - `timeout_ms`: configured timeout
    TimeoutHit,

    /// A failed attempt will be retried after a delay.
    ///
    /// Sets:
    /// - `run`, `unit`
    /// - `attempt`: the attempt that failed
    /// - `delay_ms`: delay before the next attempt
    /// - `reason`: failure message
    RetryScheduled,
}

/// Run event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Run the event belongs to.
    pub run: Option<RunId>,
    /// Unit the event refers to.
    pub unit: Option<u32>,
    /// New unit status.
    pub status: Option<UnitStatus>,
    /// Number of units in the run.
    pub unit_count: Option<u32>,
    /// Partial or final value as a decimal string.
    pub value: Option<Arc<str>>,
    /// Elapsed wall time.
    pub elapsed: Option<Duration>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Unit timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Retry delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Failure classification.
    pub failure: Option<FailureKind>,
    /// Name of the subscriber (subscriber events only).
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            run: None,
            unit: None,
            status: None,
            unit_count: None,
            value: None,
            elapsed: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            reason: None,
            failure: None,
            subscriber: None,
        }
    }

    #[inline]
    pub fn with_run(mut self, run: RunId) -> Self {
        self.run = Some(run);
        self
    }

    #[inline]
    pub fn with_unit(mut self, unit: u32) -> Self {
        self.unit = Some(unit);
        self
    }

    #[inline]
    pub fn with_status(mut self, status: UnitStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[inline]
    pub fn with_unit_count(mut self, count: u32) -> Self {
        self.unit_count = Some(count);
        self
    }

    /// Attaches a value rendered as a decimal string.
    #[inline]
    pub fn with_value(mut self, value: impl Into<Arc<str>>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed = Some(d);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(compact_ms(d));
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_failure(mut self, kind: FailureKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    /// `true` for `RunFailed`, `RunCompleted` and `RunReset`.
    #[inline]
    pub fn is_run_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::RunFailed | EventKind::RunCompleted | EventKind::RunReset
        )
    }

    /// `true` for `RunStarted` and the terminal run events; these are never dropped
    /// on the way to a subscriber.
    #[inline]
    pub fn is_run_level(&self) -> bool {
        self.kind == EventKind::RunStarted || self.is_run_terminal()
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::RunStarted);
        let b = Event::new(EventKind::RunStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_are_compacted() {
        let ev = Event::new(EventKind::RetryScheduled)
            .with_delay(Duration::from_secs(u64::MAX))
            .with_timeout(Duration::from_millis(250));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        assert_eq!(ev.timeout_ms, Some(250));
    }

    #[test]
    fn terminal_kinds() {
        assert!(Event::new(EventKind::RunCompleted).is_run_terminal());
        assert!(Event::new(EventKind::RunReset).is_run_terminal());
        assert!(!Event::new(EventKind::UnitStatusChanged).is_run_terminal());
        assert!(Event::new(EventKind::RunStarted).is_run_level());
        assert!(!Event::new(EventKind::RunStarted).is_run_terminal());
        assert!(!Event::new(EventKind::SubscriberOverflow).is_run_level());
    }
}
