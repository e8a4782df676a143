//! # rangefold
//!
//! **rangefold** splits the product of `[1, n]` into contiguous work units, runs every
//! unit concurrently on a pluggable executor, supervises the attempts, and folds the
//! partial products into one exact, arbitrary-precision value.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                    start(n)
//!                       │
//!                       ▼
//!                ┌─────────────┐      [1..k] [k+1..2k] ... [..n]
//!                │  partition  │ ───► WorkUnit 1, 2, ..., m
//!                └─────────────┘
//!                       │
//! ┌─────────────────────▼─────────────────────────────────────────────┐
//! │  Coordinator                                                      │
//! │  - RunState (FSM, single lock)                                    │
//! │  - RunDriver per run (owns the result mailbox)                    │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌────────────┐     ┌────────────┐     ┌────────────┐
//!  │ UnitActor  │     │ UnitActor  │     │ UnitActor  │   retry loop, timeout,
//!  │  unit 1    │     │  unit 2    │     │  unit m    │   semaphore, cancellation
//!  └─────┬──────┘     └─────┬──────┘     └─────┬──────┘
//!        ▼                  ▼                  ▼
//!   Executor::execute  (ProductExecutor: exact range product + FaultPolicy)
//!        │                  │                  │
//!        └──── WorkResult ──┴──── mailbox ─────┘
//!                       │
//!                       ▼
//!         all Succeeded ──► fold in unit id order ──► RunCompleted
//!         first Failed  ──► cancel the rest       ──► RunFailed
//!
//! Bus ──► listener ──► SubscriberSet ──► per-subscriber queue ──► on_event()
//! ```
//!
//! ### Run lifecycle
//! ```text
//! Idle ──start──► Distributing ──► Aggregating ──► Completed
//!                      │                │
//!                      └────────────────┴────────► Failed
//! reset(): any state ──► Idle (in-flight results are discarded by RunId)
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                          |
//! |-------------------|----------------------------------------------------------|---------------------------------------------|
//! | **Coordination**  | Start, observe and reset distribution runs.              | [`Coordinator`], [`RunHandle`], [`RunState`]|
//! | **Partitioning**  | Split `[1, n]` into boundary-disjoint units.             | [`partition`], [`WorkUnit`]                 |
//! | **Executors**     | Compute one unit; fault injection is pluggable.          | [`Executor`], [`ProductExecutor`], [`FaultPolicy`] |
//! | **Subscriber API**| Observe run and unit events (logging, counters, UIs).    | [`Subscribe`], [`Event`]                    |
//! | **Policies**      | Opt-in retries with backoff and jitter.                  | [`RetryPolicy`], [`BackoffPolicy`]          |
//! | **Errors**        | Typed errors for input, attempts and aggregation.        | [`CoordinatorError`], [`UnitError`]         |
//! | **Wire**          | JSON messages for executors in another process.          | [`UnitAssignment`], [`UnitReport`]          |
//! | **Configuration** | Centralized settings.                                    | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` (default): exports the [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use rangefold::{Config, Coordinator, RunOutcome, Subscribe, Tally};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let tally = Arc::new(Tally::new());
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![tally.clone()];
//!
//!     let coordinator = Coordinator::builder(Config::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let outcome = coordinator.start(20).unwrap().wait().await;
//!     assert_eq!(
//!         outcome.value().map(|v| v.to_string()).as_deref(),
//!         Some("2432902008176640000")
//!     );
//!
//!     coordinator.shutdown().await;
//!     assert_eq!(tally.snapshot().runs_completed, 1);
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod executor;
mod policies;
mod subscribers;
mod units;
mod wire;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_MAX_N, DEFAULT_WORKERS};
pub use core::{
    Coordinator, CoordinatorBuilder, RunFailure, RunHandle, RunOutcome, RunState, RunStatus,
    UnitSlot, UnitStatus,
};
pub use error::{AggregationError, CoordinatorError, FailureKind, UnitError};
pub use events::{Bus, Event, EventKind};
pub use executor::{
    Executor, ExecutorFn, ExecutorRef, FaultPlan, FaultPolicy, NoFaults, ProductExecutor,
    RandomFaults, ScriptedFaults, range_product,
};
pub use policies::{BackoffPolicy, JitterPolicy, RetryPolicy};
pub use subscribers::{Subscribe, SubscriberSet, Tally, TallySnapshot};
pub use units::{RunId, WorkResult, WorkUnit, partition};
pub use wire::{UnitAssignment, UnitReport, WireError};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
