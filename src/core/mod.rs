//! Runtime core: run state and orchestration.
//!
//! The public API from this module is [`Coordinator`] (built by [`CoordinatorBuilder`]),
//! the [`RunState`] it exposes through snapshots, and the [`RunHandle`] returned by
//! `start`.
//!
//! Internal modules:
//! - [`state`]: the run state machine and its transitions;
//! - [`runner`]: executes one attempt with timeout and panic isolation;
//! - [`actor`]: drives one unit with retry policy and backoff;
//! - [`aggregate`]: folds partials in unit id order;
//! - [`coordinator`]: run lifecycle, result mailbox, event publishing;
//! - [`builder`]: wiring of bus, subscribers and executor.

mod actor;
mod aggregate;
mod builder;
mod coordinator;
mod handle;
mod runner;
mod state;

pub use builder::CoordinatorBuilder;
pub use coordinator::Coordinator;
pub use handle::{RunFailure, RunHandle, RunOutcome};
pub use state::{RunState, RunStatus, UnitSlot, UnitStatus};
