//! # Executors: compute one work unit in isolation.
//!
//! - [`Executor`] trait for async, cancelable unit computations
//! - [`ExecutorFn`] closure-backed implementation; [`ExecutorRef`] shared handle
//! - [`ProductExecutor`] the production executor: exact product of the unit's range
//! - [`FaultPolicy`] pluggable fault injection consulted by [`ProductExecutor`]
//!   ([`NoFaults`], [`RandomFaults`], [`ScriptedFaults`])

mod executor;
mod executor_fn;
mod faults;
mod product;

pub use executor::{Executor, ExecutorRef};
pub use executor_fn::ExecutorFn;
pub use faults::{FaultPlan, FaultPolicy, NoFaults, RandomFaults, ScriptedFaults};
pub use product::{ProductExecutor, range_product};
