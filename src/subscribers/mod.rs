//! # Status observers for the coordinator.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for consuming the events a run publishes through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Coordinator ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::deliver
//!                                                              │
//!                                          ┌──────────────┬────┴─────────┐
//!                                          ▼              ▼              ▼
//!                                      LogWriter        Tally        custom (UI, ...)
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use rangefold::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Progress;
//!
//! #[async_trait]
//! impl Subscribe for Progress {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::RunCompleted {
//!             println!("done: {:?}", event.value);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "progress" }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;
mod tally;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
pub use tally::{Tally, TallySnapshot};
