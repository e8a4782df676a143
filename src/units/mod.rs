//! # Work units: the data the coordinator hands out and gets back.
//!
//! - [`WorkUnit`] one contiguous sub-range `[start, end]` of the overall product
//! - [`partition`] splits `[1, n]` into ordered, boundary-disjoint units
//! - [`WorkResult`] the outcome of one attempt on one unit
//! - [`RunId`] identifies a distribution run; results tagged with a stale id are discarded

mod partition;
mod result;
mod unit;

pub use partition::partition;
pub use result::WorkResult;
pub use unit::{RunId, WorkUnit};
