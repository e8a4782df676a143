//! # LogWriter: structured event logger
//!
//! A subscriber that renders incoming [`Event`]s as `tracing` records under the
//! `rangefold::events` target.
//!
//! ## Example output (compact formatter)
//! ```text
//! INFO rangefold::events: run started run=#1 units=4
//! DEBUG rangefold::events: unit status run=#1 unit=3 status=running attempt=1
//! INFO rangefold::events: unit status run=#1 unit=3 status=succeeded elapsed=1.42s
//! WARN rangefold::events: run failed run=#1 unit=2 kind=executor reason="worker 2 encountered an error"
//! INFO rangefold::events: run completed run=#1 digits=7
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::core::UnitStatus;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let run = e.run.map(|r| r.to_string()).unwrap_or_default();
        match e.kind {
            EventKind::RunStarted => {
                info!(target: "rangefold::events", %run, units = ?e.unit_count, "run started");
            }
            EventKind::UnitStatusChanged => match e.status {
                Some(UnitStatus::Failed) => warn!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    status = "failed",
                    elapsed = ?e.elapsed,
                    reason = e.reason.as_deref().unwrap_or("unknown"),
                    "unit status"
                ),
                Some(UnitStatus::Succeeded) => info!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    status = "succeeded",
                    elapsed = ?e.elapsed,
                    digits = e.value.as_deref().map(str::len),
                    "unit status"
                ),
                status => debug!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    status = status.map(|s| s.as_label()).unwrap_or("unknown"),
                    attempt = ?e.attempt,
                    "unit status"
                ),
            },
            EventKind::TimeoutHit => {
                warn!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    timeout_ms = ?e.timeout_ms,
                    attempt = ?e.attempt,
                    "unit timeout"
                );
            }
            EventKind::RetryScheduled => {
                info!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    delay_ms = ?e.delay_ms,
                    after_attempt = ?e.attempt,
                    reason = e.reason.as_deref().unwrap_or(""),
                    "retry scheduled"
                );
            }
            EventKind::RunFailed => {
                warn!(
                    target: "rangefold::events",
                    %run,
                    unit = ?e.unit,
                    kind = e.failure.map(|k| k.as_label()).unwrap_or("unknown"),
                    reason = e.reason.as_deref().unwrap_or("unknown"),
                    "run failed"
                );
            }
            EventKind::RunCompleted => {
                info!(
                    target: "rangefold::events",
                    %run,
                    digits = e.value.as_deref().map(str::len),
                    elapsed = ?e.elapsed,
                    "run completed"
                );
            }
            EventKind::RunReset => {
                info!(target: "rangefold::events", %run, "run reset");
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: "rangefold::events",
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    reason = e.reason.as_deref().unwrap_or("unknown"),
                    "subscriber overflow"
                );
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    target: "rangefold::events",
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    info = e.reason.as_deref().unwrap_or("unknown"),
                    "subscriber panicked"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
