//! # UnitActor: drives one work unit to a final result.
//!
//! Runs attempts of one [`WorkUnit`] on an [`Executor`] under:
//! - retries per [`RetryPolicy`],
//! - delays per [`BackoffPolicy`],
//! - optional per-attempt timeout,
//! - cooperative cancellation via the run's [`CancellationToken`].
//!
//! The actor never touches run state. It reports to the run driver's mailbox and the
//! driver applies each report under the state lock.
//!
//! ## Architecture
//! ```text
//! loop {
//!   ├─► acquire semaphore (cancellable)
//!   ├─► report Started
//!   ├─► run_once() ─────► executor.execute()
//!   │       ▼
//!   │     Ok ──────────────────────────────► report Finished(Success) → break
//!   │     Err(Canceled) ───────────────────► break (run is gone)
//!   │     Err(e):
//!   │       ├─► Timeout → report TimedOut
//!   │       ├─► RetryPolicy allows → report Retrying → sleep(backoff) → continue
//!   │       └─► otherwise ─────────────────► report Finished(Failure) → break
//! }
//! ```
//!
//! ## Rules
//! - Attempts run **sequentially** within one actor
//! - The attempt counter is 1-based and monotonic
//! - Cancellation is checked at safe points (semaphore acquire, backoff sleep)
//! - The semaphore permit is released before the backoff sleep

use std::{sync::Arc, time::Duration};

use tokio::{
    select,
    sync::{Semaphore, mpsc},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    core::runner::run_once,
    error::UnitError,
    executor::ExecutorRef,
    policies::{BackoffPolicy, RetryPolicy},
    units::{RunId, WorkResult, WorkUnit},
};

/// Per-unit supervision parameters, taken from [`Config`](crate::Config).
#[derive(Clone, Debug)]
pub(crate) struct UnitActorParams {
    pub retry: RetryPolicy,
    pub backoff: BackoffPolicy,
    pub timeout: Option<Duration>,
}

/// What an actor tells the run driver.
#[derive(Debug)]
pub(crate) enum Report {
    /// Attempt `attempt` began executing.
    Started { unit: u32, attempt: u32 },
    /// Attempt `attempt` exceeded the timeout.
    TimedOut {
        unit: u32,
        attempt: u32,
        timeout: Duration,
    },
    /// Attempt `attempt` failed and another one follows after `delay`.
    Retrying {
        attempt: u32,
        delay: Duration,
        result: WorkResult,
    },
    /// The unit's final result.
    Finished { attempt: u32, result: WorkResult },
}

/// A report tagged with the run it belongs to.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub run: RunId,
    pub report: Report,
}

/// Supervises one unit of one run.
pub(crate) struct UnitActor {
    run: RunId,
    unit: WorkUnit,
    executor: ExecutorRef,
    params: UnitActorParams,
    mailbox: mpsc::Sender<Envelope>,
    semaphore: Option<Arc<Semaphore>>,
}

impl UnitActor {
    pub fn new(
        run: RunId,
        unit: WorkUnit,
        executor: ExecutorRef,
        params: UnitActorParams,
        mailbox: mpsc::Sender<Envelope>,
        semaphore: Option<Arc<Semaphore>>,
    ) -> Self {
        Self {
            run,
            unit,
            executor,
            params,
            mailbox,
            semaphore,
        }
    }

    /// Runs attempts until the unit has a final result or `token` is cancelled.
    ///
    /// Exits without a final report when the run is cancelled, the semaphore is
    /// closed, or the driver has stopped listening.
    pub async fn run(self, token: CancellationToken) {
        let mut attempt: u32 = 0;
        let unit_id = self.unit.id();

        loop {
            if token.is_cancelled() {
                break;
            }
            let permit = match &self.semaphore {
                Some(sem) => {
                    let permit_future = sem.clone().acquire_owned();
                    tokio::pin!(permit_future);

                    select! {
                        res = &mut permit_future => match res {
                            Ok(permit) => Some(permit),
                            Err(_closed) => break,
                        },
                        _ = token.cancelled() => break,
                    }
                }
                None => None,
            };

            attempt = attempt.saturating_add(1);
            if !self
                .report(Report::Started {
                    unit: unit_id,
                    attempt,
                })
                .await
            {
                break;
            }

            let done = run_once(
                self.executor.as_ref(),
                self.unit,
                attempt,
                &token,
                self.params.timeout,
            )
            .await;
            drop(permit);

            let err = match &done.outcome {
                Ok(_) => {
                    self.report(Report::Finished {
                        attempt,
                        result: done.to_result(),
                    })
                    .await;
                    break;
                }
                Err(UnitError::Canceled) if token.is_cancelled() => break,
                Err(e) => e,
            };

            if let UnitError::Timeout { timeout } = err {
                let timed_out = Report::TimedOut {
                    unit: unit_id,
                    attempt,
                    timeout: *timeout,
                };
                if !self.report(timed_out).await {
                    break;
                }
            }

            if !self.params.retry.allows(attempt, err) {
                self.report(Report::Finished {
                    attempt,
                    result: done.to_result(),
                })
                .await;
                break;
            }

            let delay = self.params.backoff.next(attempt - 1);
            let retrying = Report::Retrying {
                attempt,
                delay,
                result: done.to_result(),
            };
            if !self.report(retrying).await {
                break;
            }

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            select! {
                _ = &mut sleep => {}
                _ = token.cancelled() => break,
            }
        }
    }

    /// Sends a report; `false` once the driver is gone.
    async fn report(&self, report: Report) -> bool {
        self.mailbox
            .send(Envelope {
                run: self.run,
                report,
            })
            .await
            .is_ok()
    }
}
