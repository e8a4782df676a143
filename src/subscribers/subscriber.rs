//! # Status observer interface.
//!
//! [`Subscribe`] is how anything outside the coordinator watches a run: a progress
//! UI, the bundled [`LogWriter`](crate::LogWriter) and [`Tally`](crate::Tally), or
//! an exporter. Observers are push-only; nothing they do reaches back into the run.
//!
//! ## Delivery
//! | Events                                                 | Queue full          |
//! |--------------------------------------------------------|---------------------|
//! | `RunStarted`, `RunCompleted`, `RunFailed`, `RunReset`  | delivery waits      |
//! | unit status, timeouts, retries, subscriber events      | dropped + overflow  |
//!
//! A run's outcome therefore always reaches every observer, while a slow observer may
//! miss intermediate unit churn (and is told so through `SubscriberOverflow`).

use async_trait::async_trait;

use crate::events::Event;

/// Observer of run events.
///
/// Runs on its own worker task behind a bounded queue; `on_event` is never entered
/// twice at once for the same observer.
///
/// ### Implementation requirements
/// - Return promptly. A handler that never returns holds up run-level events for
///   every observer, since those wait for queue room.
/// - Do not panic; a panic is caught and reported as `SubscriberPanicked`.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event, in bus order.
    async fn on_event(&self, event: &Event);

    /// Name used in logs and in overflow/panic events.
    ///
    /// Defaults to `type_name::<Self>()`.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue capacity for this observer (at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }

    /// Filters events before they are queued; declined events cost no queue room.
    ///
    /// Called from the fan-out task, so keep it cheap.
    fn accepts(&self, _event: &Event) -> bool {
        true
    }
}
