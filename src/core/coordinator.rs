//! # Coordinator: owns the lifecycle of distribution runs.
//!
//! The [`Coordinator`] partitions `[1, n]`, dispatches every unit to its own
//! [`UnitActor`], collects their reports, and folds the partials once all succeeded.
//!
//! ## Architecture
//! ```text
//! start(n) ──► partition ──► RunState::begin ──► RunStarted, Pending×k
//!                 │
//!                 └──► RunDriver (one per run)
//!                        ├──► UnitActor 1 ──┐
//!                        ├──► UnitActor 2 ──┼──► mailbox (mpsc) ──► Shared::apply
//!                        └──► UnitActor k ──┘                          │
//!                                                       lock RunState, mutate, publish
//!                                                                      │
//!                     first Failure ──► RunFailed, cancel run token ◄──┤
//!                     all Succeeded ──► Aggregating ──► fold (blocking pool)
//!                                                        └──► Completed, RunCompleted
//! ```
//!
//! ## Rules
//! - RunState has one mutation point (the `Shared` lock); events are published while
//!   it is held, so per-run event order equals mutation order.
//! - Every report carries its [`RunId`]; reports for a run that is no longer active
//!   are dropped without touching state.
//! - At most one run is active; `start` during `Distributing` or `Aggregating` fails
//!   with [`CoordinatorError::RunInProgress`].
//! - `reset()` is always legal and idempotent.

use std::sync::Arc;

use num_bigint::BigUint;
use parking_lot::Mutex;
use tokio::{
    select,
    sync::{Semaphore, broadcast, mpsc, oneshot},
    task::{JoinHandle, JoinSet},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    core::{
        actor::{Envelope, Report, UnitActor, UnitActorParams},
        aggregate::aggregate,
        handle::{RunFailure, RunHandle, RunOutcome},
        state::{RunState, UnitSlot, UnitStatus},
    },
    error::{AggregationError, CoordinatorError, FailureKind},
    events::{Bus, Event, EventKind},
    executor::ExecutorRef,
    units::{RunId, WorkResult, WorkUnit, partition},
};

const MAILBOX_CAPACITY: usize = 256;

/// The run currently owning the state.
struct ActiveRun {
    run: RunId,
    token: CancellationToken,
    outcome: oneshot::Sender<RunOutcome>,
}

impl ActiveRun {
    fn resolve(self, outcome: RunOutcome) {
        self.token.cancel();
        let _ = self.outcome.send(outcome);
    }
}

struct Inner {
    state: RunState,
    active: Option<ActiveRun>,
}

impl Inner {
    fn is_current(&self, run: RunId) -> bool {
        self.active.as_ref().is_some_and(|a| a.run == run)
    }

    fn fail_run(
        &mut self,
        bus: &Bus,
        run: RunId,
        unit: Option<u32>,
        kind: FailureKind,
        message: String,
    ) {
        if let Err(e) = self.state.fail(run, unit, kind, message.clone()) {
            warn!(run = %run, error = %e, "cannot fail run");
            return;
        }
        let mut ev = Event::new(EventKind::RunFailed)
            .with_run(run)
            .with_reason(message.clone())
            .with_failure(kind);
        if let Some(unit) = unit {
            ev = ev.with_unit(unit);
        }
        bus.publish(ev);
        warn!(run = %run, failure = %kind, reason = %message, "run failed");

        if let Some(active) = self.active.take() {
            active.resolve(RunOutcome::Failed(RunFailure {
                kind,
                unit,
                message,
            }));
        }
    }

    fn complete_run(&mut self, bus: &Bus, run: RunId, value: BigUint) {
        if let Err(e) = self.state.complete(run, value.clone()) {
            warn!(run = %run, error = %e, "cannot complete run");
            return;
        }
        let mut ev = Event::new(EventKind::RunCompleted)
            .with_run(run)
            .with_value(value.to_string());
        if let Some(elapsed) = self.state.elapsed() {
            ev = ev.with_elapsed(elapsed);
        }
        bus.publish(ev);
        info!(run = %run, digits = value.to_string().len(), "run completed");

        if let Some(active) = self.active.take() {
            active.resolve(RunOutcome::Completed(value));
        }
    }
}

/// What the driver does after a report was applied.
enum Flow {
    Continue,
    Stop,
    Aggregate(Vec<UnitSlot>),
}

/// State shared between the coordinator and its run drivers.
struct Shared {
    inner: Mutex<Inner>,
    bus: Bus,
}

impl Shared {
    fn new(bus: Bus) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RunState::idle(),
                active: None,
            }),
            bus,
        }
    }

    /// Applies one actor report to the run state.
    fn apply(&self, env: Envelope) -> Flow {
        let run = env.run;
        let mut inner = self.inner.lock();
        if !inner.is_current(run) {
            debug!(run = %run, "dropping report for inactive run");
            return Flow::Continue;
        }

        match env.report {
            Report::Started { unit, attempt } => {
                if let Err(e) = inner.state.mark_running(run, unit, attempt) {
                    warn!(run = %run, unit, error = %e, "rejected attempt start");
                    return Flow::Continue;
                }
                self.bus.publish(
                    Event::new(EventKind::UnitStatusChanged)
                        .with_run(run)
                        .with_unit(unit)
                        .with_status(UnitStatus::Running)
                        .with_attempt(attempt),
                );
                Flow::Continue
            }
            Report::TimedOut {
                unit,
                attempt,
                timeout,
            } => {
                self.bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_run(run)
                        .with_unit(unit)
                        .with_attempt(attempt)
                        .with_timeout(timeout),
                );
                Flow::Continue
            }
            Report::Retrying {
                attempt,
                delay,
                result,
            } => {
                let unit = result.unit_id();
                let reason = failure_of(&result).map(|(_, msg)| msg).unwrap_or_default();
                if let Err(e) = inner.state.record_retry(run, result) {
                    warn!(run = %run, unit, error = %e, "rejected retry");
                    return Flow::Continue;
                }
                self.bus.publish(
                    Event::new(EventKind::RetryScheduled)
                        .with_run(run)
                        .with_unit(unit)
                        .with_attempt(attempt)
                        .with_delay(delay)
                        .with_reason(reason),
                );
                Flow::Continue
            }
            Report::Finished { attempt, result } => {
                let unit = result.unit_id();
                let ev = unit_finished_event(run, attempt, &result);
                let failure = failure_of(&result);

                match inner.state.record(run, result) {
                    Err(e) => {
                        warn!(run = %run, unit, error = %e, "rejected unit result");
                        Flow::Continue
                    }
                    Ok(_) => {
                        self.bus.publish(ev);
                        if let Some((kind, msg)) = failure {
                            let message = format!("unit {unit} failed: {msg}");
                            inner.fail_run(&self.bus, run, Some(unit), kind, message);
                            return Flow::Stop;
                        }
                        if !inner.state.all_succeeded() {
                            return Flow::Continue;
                        }
                        match inner.state.begin_aggregation(run) {
                            Ok(()) => {
                                debug!(run = %run, "aggregating partials");
                                Flow::Aggregate(inner.state.slots().to_vec())
                            }
                            Err(e) => {
                                warn!(run = %run, error = %e, "cannot aggregate");
                                Flow::Continue
                            }
                        }
                    }
                }
            }
        }
    }

    /// Stores the folded value (or aggregation error) if `run` is still current.
    fn finish(&self, run: RunId, folded: Result<BigUint, AggregationError>) {
        let mut inner = self.inner.lock();
        if !inner.is_current(run) {
            debug!(run = %run, "dropping aggregate for inactive run");
            return;
        }
        match folded {
            Ok(value) => inner.complete_run(&self.bus, run, value),
            Err(e) => {
                let message = format!("aggregation failed: {e}");
                inner.fail_run(
                    &self.bus,
                    run,
                    Some(e.unit()),
                    FailureKind::Aggregation,
                    message,
                );
            }
        }
    }

    /// Fails `run` if it is still current; used when the run ends abnormally.
    fn abort(&self, run: RunId, kind: FailureKind, message: String) {
        let mut inner = self.inner.lock();
        if inner.is_current(run) {
            inner.fail_run(&self.bus, run, None, kind, message);
        }
    }
}

fn failure_of(result: &WorkResult) -> Option<(FailureKind, String)> {
    match result {
        WorkResult::Failure { kind, message, .. } => Some((*kind, message.clone())),
        WorkResult::Success { .. } => None,
    }
}

fn unit_finished_event(run: RunId, attempt: u32, result: &WorkResult) -> Event {
    let ev = Event::new(EventKind::UnitStatusChanged)
        .with_run(run)
        .with_unit(result.unit_id())
        .with_attempt(attempt)
        .with_elapsed(result.elapsed());
    match result {
        WorkResult::Success { value, .. } => ev
            .with_status(UnitStatus::Succeeded)
            .with_value(value.to_string()),
        WorkResult::Failure { kind, message, .. } => ev
            .with_status(UnitStatus::Failed)
            .with_reason(message.as_str())
            .with_failure(*kind),
    }
}

/// Owns one run's mailbox and actors.
struct RunDriver {
    run: RunId,
    units: Vec<WorkUnit>,
    shared: Arc<Shared>,
    executor: ExecutorRef,
    params: UnitActorParams,
    semaphore: Option<Arc<Semaphore>>,
    token: CancellationToken,
}

impl RunDriver {
    async fn drive(self) {
        let (tx, mut mailbox) = mpsc::channel::<Envelope>(MAILBOX_CAPACITY);
        let mut actors = JoinSet::new();
        for unit in &self.units {
            let actor = UnitActor::new(
                self.run,
                *unit,
                self.executor.clone(),
                self.params.clone(),
                tx.clone(),
                self.semaphore.clone(),
            );
            actors.spawn(actor.run(self.token.clone()));
        }
        drop(tx);

        let flow = loop {
            let env = select! {
                biased;
                _ = self.token.cancelled() => break Flow::Stop,
                msg = mailbox.recv() => match msg {
                    Some(env) => env,
                    None => break Flow::Continue,
                },
            };
            match self.shared.apply(env) {
                Flow::Continue => continue,
                other => break other,
            }
        };

        match flow {
            Flow::Aggregate(slots) => {
                match tokio::task::spawn_blocking(move || aggregate(&slots)).await {
                    Ok(folded) => self.shared.finish(self.run, folded),
                    Err(e) => self.shared.abort(
                        self.run,
                        FailureKind::Aggregation,
                        format!("aggregation task failed: {e}"),
                    ),
                }
            }
            // Mailbox closed while the run was still active.
            Flow::Continue => self.shared.abort(
                self.run,
                FailureKind::Executor,
                "units exited without reporting a result".to_string(),
            ),
            Flow::Stop => {}
        }

        self.token.cancel();
        actors.detach_all();
    }
}

/// Coordinates distribution runs over a pluggable [`Executor`](crate::Executor).
///
/// Construct with [`Coordinator::builder`]. Requires a running tokio runtime.
///
/// # Example
/// ```rust
/// use rangefold::{Config, Coordinator, RunOutcome};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let coordinator = Coordinator::builder(Config::default()).build();
///
///     let handle = coordinator.start(10).unwrap();
///     match handle.wait().await {
///         RunOutcome::Completed(value) => assert_eq!(value.to_string(), "3628800"),
///         other => panic!("unexpected outcome: {other:?}"),
///     }
///
///     coordinator.shutdown().await;
/// }
/// ```
pub struct Coordinator {
    cfg: Config,
    shared: Arc<Shared>,
    executor: ExecutorRef,
    semaphore: Option<Arc<Semaphore>>,
    runtime_token: CancellationToken,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        executor: ExecutorRef,
        semaphore: Option<Arc<Semaphore>>,
        runtime_token: CancellationToken,
        listener: JoinHandle<()>,
    ) -> Self {
        Self {
            cfg,
            shared: Arc::new(Shared::new(bus)),
            executor,
            semaphore,
            runtime_token,
            listener: Mutex::new(Some(listener)),
        }
    }

    /// Starts building a coordinator.
    pub fn builder(cfg: Config) -> super::CoordinatorBuilder {
        super::CoordinatorBuilder::new(cfg)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Raw event stream, in addition to the configured subscribers.
    ///
    /// Only events published after this call are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.shared.bus.subscribe()
    }

    /// Starts a run computing the product of `[1, n]`.
    ///
    /// ### Errors
    /// - [`CoordinatorError::InvalidInput`] if `n` is 0 or above the configured maximum,
    ///   or the worker count is 0. Nothing is published.
    /// - [`CoordinatorError::RunInProgress`] if a run is distributing or aggregating.
    pub fn start(&self, n: u64) -> Result<RunHandle, CoordinatorError> {
        if let Some(max) = self.cfg.n_limit() {
            if n > max {
                return Err(CoordinatorError::invalid(format!(
                    "n must be at most {max}, got {n}"
                )));
            }
        }
        let units = partition(n, self.cfg.worker_count)?;

        let run = RunId::next();
        let token = self.runtime_token.child_token();
        let (outcome_tx, outcome_rx) = oneshot::channel();
        {
            let mut inner = self.shared.inner.lock();
            if let Some(active) = &inner.active {
                return Err(CoordinatorError::RunInProgress { run: active.run });
            }
            inner
                .state
                .begin(run, &units)
                .map_err(|e| CoordinatorError::invalid(e.to_string()))?;
            inner.active = Some(ActiveRun {
                run,
                token: token.clone(),
                outcome: outcome_tx,
            });

            self.shared.bus.publish(
                Event::new(EventKind::RunStarted)
                    .with_run(run)
                    .with_unit_count(units.len() as u32),
            );
            for unit in &units {
                self.shared.bus.publish(
                    Event::new(EventKind::UnitStatusChanged)
                        .with_run(run)
                        .with_unit(unit.id())
                        .with_status(UnitStatus::Pending),
                );
            }
            info!(run = %run, n, units = units.len(), "run started");
        }

        let driver = RunDriver {
            run,
            units,
            shared: Arc::clone(&self.shared),
            executor: self.executor.clone(),
            params: UnitActorParams {
                retry: self.cfg.retry,
                backoff: self.cfg.backoff,
                timeout: self.cfg.timeout(),
            },
            semaphore: self.semaphore.clone(),
            token,
        };
        tokio::spawn(driver.drive());

        Ok(RunHandle::new(run, outcome_rx))
    }

    /// Discards the current run (if any) and returns to `Idle`.
    ///
    /// In-flight executors are cancelled cooperatively; anything they report later is
    /// ignored. Publishes `RunReset` only when a non-idle state was discarded.
    pub fn reset(&self) {
        let mut inner = self.shared.inner.lock();
        let discarded = inner.state.run();
        if let Some(active) = inner.active.take() {
            active.resolve(RunOutcome::Cancelled);
        }
        inner.state.reset();

        if let Some(run) = discarded {
            self.shared
                .bus
                .publish(Event::new(EventKind::RunReset).with_run(run));
            info!(run = %run, "run reset");
        }
    }

    /// Copy of the current run state.
    pub fn snapshot(&self) -> RunState {
        self.shared.inner.lock().state.clone()
    }

    /// Resets, stops the event listener and waits until subscribers drained their queues.
    pub async fn shutdown(&self) {
        self.reset();
        self.runtime_token.cancel();
        let listener = self.listener.lock().take();
        if let Some(handle) = listener {
            let _ = handle.await;
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn success(unit: u32, value: u32) -> WorkResult {
        WorkResult::Success {
            unit_id: unit,
            value: BigUint::from(value),
            elapsed: Duration::from_millis(1),
        }
    }

    fn activate(shared: &Shared, run: RunId, n: u64, workers: u32) -> oneshot::Receiver<RunOutcome> {
        let (tx, rx) = oneshot::channel();
        let mut inner = shared.inner.lock();
        inner.state.begin(run, &partition(n, workers).unwrap()).unwrap();
        inner.active = Some(ActiveRun {
            run,
            token: CancellationToken::new(),
            outcome: tx,
        });
        rx
    }

    #[test]
    fn stale_report_is_dropped() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let shared = Shared::new(bus);
        let _outcome = activate(&shared, RunId::from_raw(200), 4, 2);
        let before = shared.inner.lock().state.clone();

        let flow = shared.apply(Envelope {
            run: RunId::from_raw(199),
            report: Report::Finished {
                attempt: 1,
                result: success(1, 2),
            },
        });

        assert!(matches!(flow, Flow::Continue));
        assert_eq!(shared.inner.lock().state, before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn failure_fails_run_and_resolves_handle() {
        let shared = Shared::new(Bus::new(16));
        let run = RunId::from_raw(201);
        let mut outcome = activate(&shared, run, 10, 4);

        let flow = shared.apply(Envelope {
            run,
            report: Report::Finished {
                attempt: 1,
                result: WorkResult::Failure {
                    unit_id: 2,
                    kind: FailureKind::Executor,
                    message: "worker 2 encountered an error".into(),
                    elapsed: Duration::ZERO,
                },
            },
        });

        assert!(matches!(flow, Flow::Stop));
        let state = shared.inner.lock().state.clone();
        assert_eq!(state.failing_unit(), Some(2));
        assert_eq!(
            state.error_message(),
            Some("unit 2 failed: worker 2 encountered an error")
        );
        assert!(matches!(
            outcome.try_recv(),
            Ok(RunOutcome::Failed(RunFailure { unit: Some(2), .. }))
        ));
    }

    #[test]
    fn last_success_requests_aggregation() {
        let shared = Shared::new(Bus::new(16));
        let run = RunId::from_raw(202);
        let _outcome = activate(&shared, run, 4, 2);

        let first = shared.apply(Envelope {
            run,
            report: Report::Finished {
                attempt: 1,
                result: success(2, 12),
            },
        });
        assert!(matches!(first, Flow::Continue));
        let second = shared.apply(Envelope {
            run,
            report: Report::Finished {
                attempt: 1,
                result: success(1, 2),
            },
        });
        let Flow::Aggregate(slots) = second else {
            panic!("expected aggregation");
        };
        assert_eq!(aggregate(&slots).unwrap(), BigUint::from(24u32));
    }
}
