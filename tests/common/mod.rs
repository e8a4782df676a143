//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use rangefold::{
    Config, Coordinator, Event, EventKind, ExecutorRef, ProductExecutor, RunId, ScriptedFaults,
    Subscribe, UnitStatus,
};
use tokio::sync::mpsc;

/// Forwards every event it sees into a channel.
pub struct Recorder {
    tx: mpsc::UnboundedSender<Event>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        let _ = self.tx.send(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }

    // Large enough that no test run overflows it.
    fn queue_capacity(&self) -> usize {
        1 << 16
    }
}

/// A coordinator wired to a [`Recorder`].
pub struct Harness {
    pub coordinator: Coordinator,
    events: mpsc::UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new(cfg: Config, executor: ExecutorRef) -> Self {
        Self::with_extra(cfg, executor, Vec::new())
    }

    pub fn with_extra(cfg: Config, executor: ExecutorRef, extra: Vec<Arc<dyn Subscribe>>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let mut subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Recorder { tx })];
        subs.extend(extra);
        let coordinator = Coordinator::builder(cfg)
            .with_executor(executor)
            .with_subscribers(subs)
            .build();
        Self {
            coordinator,
            events,
        }
    }

    /// Shuts the coordinator down and returns everything the recorder saw.
    pub async fn finish(mut self) -> Vec<Event> {
        self.coordinator.shutdown().await;
        let mut out = Vec::new();
        while let Ok(ev) = self.events.try_recv() {
            out.push(ev);
        }
        out
    }
}

pub fn product(faults: ScriptedFaults) -> ExecutorRef {
    Arc::new(ProductExecutor::with_faults(Arc::new(faults)))
}

pub fn of_kind(events: &[Event], kind: EventKind) -> Vec<&Event> {
    events.iter().filter(|e| e.kind == kind).collect()
}

pub fn for_run(events: &[Event], run: RunId) -> Vec<&Event> {
    events.iter().filter(|e| e.run == Some(run)).collect()
}

/// Status sequence reported for one unit.
pub fn statuses(events: &[Event], unit: u32) -> Vec<UnitStatus> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::UnitStatusChanged && e.unit == Some(unit))
        .filter_map(|e| e.status)
        .collect()
}
