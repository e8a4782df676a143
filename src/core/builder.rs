use std::sync::Arc;

use tokio::{
    select,
    sync::{Semaphore, broadcast::error::RecvError, broadcast::error::TryRecvError},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    core::Coordinator,
    events::{Bus, Event},
    executor::{ExecutorRef, ProductExecutor},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Coordinator`].
pub struct CoordinatorBuilder {
    cfg: Config,
    executor: Option<ExecutorRef>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            executor: None,
            subscribers: Vec::new(),
        }
    }

    /// Sets the executor every unit runs on.
    ///
    /// Defaults to a [`ProductExecutor`] without fault injection.
    pub fn with_executor(mut self, executor: ExecutorRef) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive run events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the coordinator and spawns the event listener.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Coordinator {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        // Subscribe before anything can publish.
        let rx = bus.subscribe();
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let runtime_token = CancellationToken::new();

        let semaphore = self
            .cfg
            .concurrency_limit()
            .map(Semaphore::new)
            .map(Arc::new);
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ProductExecutor::new()));

        let listener = spawn_listener(rx, subs, runtime_token.clone());
        Coordinator::new_internal(self.cfg, bus, executor, semaphore, runtime_token, listener)
    }
}

/// Forwards bus events to the subscriber set until `token` is cancelled, then
/// flushes what is still buffered and drains the subscribers.
///
/// Delivery of run-level events may wait on a full subscriber queue; the bus is sized
/// by [`Config::bus_capacity_clamped`] so a run's events stay buffered meanwhile.
fn spawn_listener(
    mut rx: tokio::sync::broadcast::Receiver<Event>,
    subs: SubscriberSet,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => subs.deliver(ev).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = token.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => subs.deliver(ev).await,
                            Err(TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        subs.shutdown().await;
    })
}
