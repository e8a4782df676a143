//! Retry policies for work units.
//!
//! These knobs only matter when retry is opted into; the default is fail-fast.
//!
//! ## Contents
//! - [`RetryPolicy`] whether a failed unit gets another attempt (never / bounded)
//! - [`BackoffPolicy`] how the delay before the next attempt grows (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of that delay
//!
//! ## Quick wiring
//! ```text
//! Config { retry, backoff, unit_timeout }
//!      └─► core::actor::UnitActor uses:
//!           - retry.allows(attempt, &err) to decide retry/give up
//!           - backoff.next(attempt - 1) to schedule the next attempt
//! ```

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::RetryPolicy;
