//! # Fan-out of run events to status observers.
//!
//! [`SubscriberSet`] gives each observer its own inbox (bounded queue) and worker.
//! The coordinator's listener hands it every bus event through
//! [`SubscriberSet::deliver`].
//!
//! ```text
//! listener ── deliver(ev) ──┬──► inbox "log"   ──► worker ──► LogWriter::on_event
//!                           ├──► inbox "tally" ──► worker ──► Tally::on_event
//!                           └──► inbox "ui"    ──► worker ──► ...
//!
//!   run-level event, inbox full ──► deliver waits for room
//!   unit churn,      inbox full ──► dropped for that observer, SubscriberOverflow
//! ```
//!
//! ## Rules
//! - Each observer sees the events it accepts in bus order.
//! - `RunStarted`, `RunCompleted`, `RunFailed` and `RunReset` are never dropped.
//! - Unit and subscriber events are best-effort per observer.
//! - A panic in `on_event` is published as `SubscriberPanicked`; the worker carries on
//!   with the next event. State shared with the panicking handler may be left half-updated.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
};
use tracing::{debug, warn};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// Sending side of one observer's queue.
struct Inbox {
    observer: Arc<dyn Subscribe>,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Event fan-out over a fixed set of observers.
pub struct SubscriberSet {
    inboxes: Vec<Inbox>,
    workers: JoinSet<()>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per observer. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut inboxes = Vec::with_capacity(observers.len());
        let mut workers = JoinSet::new();

        for observer in observers {
            let (tx, rx) = mpsc::channel(observer.queue_capacity().max(1));
            workers.spawn(observe(Arc::clone(&observer), rx, bus.clone()));
            inboxes.push(Inbox { observer, tx });
        }
        Self {
            inboxes,
            workers,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.inboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inboxes.is_empty()
    }

    /// Queues `event` for every observer that accepts it.
    ///
    /// Returns once run-level events are queued everywhere; unit churn never waits.
    pub async fn deliver(&self, event: Event) {
        let event = Arc::new(event);
        let must_arrive = event.is_run_level();

        for inbox in &self.inboxes {
            if !inbox.observer.accepts(&event) {
                continue;
            }
            let queued = Arc::clone(&event);
            let dropped = if must_arrive {
                inbox.tx.send(queued).await.err().map(|_| "closed")
            } else {
                match inbox.tx.try_send(queued) {
                    Ok(()) => None,
                    Err(TrySendError::Full(_)) => Some("full"),
                    Err(TrySendError::Closed(_)) => Some("closed"),
                }
            };
            if let Some(reason) = dropped {
                self.dropped(inbox.observer.name(), reason, &event);
            }
        }
    }

    fn dropped(&self, observer: &'static str, reason: &'static str, event: &Event) {
        debug!(subscriber = observer, reason, kind = ?event.kind, seq = event.seq, "event dropped");
        // An overflow about an overflow would feed itself.
        if event.kind != EventKind::SubscriberOverflow {
            self.bus.publish(Event::subscriber_overflow(observer, reason));
        }
    }

    /// Closes every inbox and waits until the workers handled what was queued.
    pub async fn shutdown(self) {
        let Self {
            inboxes,
            mut workers,
            ..
        } = self;
        drop(inboxes);
        while workers.join_next().await.is_some() {}
    }
}

async fn observe(observer: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let handled = AssertUnwindSafe(observer.on_event(&event)).catch_unwind().await;
        if let Err(payload) = handled {
            let info = describe_panic(payload.as_ref());
            warn!(subscriber = observer.name(), %info, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(observer.name(), info));
        }
    }
}

fn describe_panic(payload: &(dyn Any + Send)) -> String {
    match (payload.downcast_ref::<&'static str>(), payload.downcast_ref::<String>()) {
        (Some(msg), _) => (*msg).to_string(),
        (None, Some(msg)) => msg.clone(),
        (None, None) => "unknown panic".to_string(),
    }
}
