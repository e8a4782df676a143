//! # Coordinator configuration.
//!
//! Provides [`Config`], the centralized settings of a [`Coordinator`](crate::Coordinator).
//!
//! ## Sentinel values
//! - `max_n = 0` → no upper bound on `n`
//! - `max_concurrent = 0` → unlimited (no semaphore created)
//! - `unit_timeout = 0s` → no per-unit timeout

use std::time::Duration;

use crate::policies::{BackoffPolicy, RetryPolicy};

/// Upper bound on `n` used by [`Config::default`], matching the classic 1 to 1000 input range.
pub const DEFAULT_MAX_N: u64 = 1000;

/// Number of executors a run is split across by default.
pub const DEFAULT_WORKERS: u32 = 4;

/// Bus slots reserved per unit: `Pending`, `Running`, terminal status, one spare.
const EVENTS_PER_UNIT: usize = 4;
/// Bus slots reserved for run-level and subscriber events.
const RUN_EVENT_SLACK: usize = 8;

/// Configuration for the coordinator.
///
/// ## Field semantics
/// - `worker_count`: number of units `[1, n]` is split into (min 1)
/// - `max_n`: largest accepted `n` (`0` = unbounded); a safety limit, not a correctness one
/// - `max_concurrent`: executors allowed to run at once (`0` = unlimited)
/// - `bus_capacity`: event bus ring buffer size; raised to fit one whole run (see
///   [`Config::bus_capacity_clamped`])
/// - `unit_timeout`: per-attempt timeout (`0s` = unbounded wait)
/// - `retry`: what happens after a failed attempt (default: fail fast)
/// - `backoff`: delay between attempts when retry is enabled
#[derive(Clone, Debug)]
pub struct Config {
    pub worker_count: u32,
    pub max_n: u64,
    pub max_concurrent: usize,
    pub bus_capacity: usize,
    pub unit_timeout: Duration,
    pub retry: RetryPolicy,
    pub backoff: BackoffPolicy,
}

impl Config {
    /// Returns the concurrency limit as an `Option`.
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the per-unit timeout as an `Option`.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        if self.unit_timeout == Duration::ZERO {
            None
        } else {
            Some(self.unit_timeout)
        }
    }

    /// Returns the upper bound on `n` as an `Option`.
    #[inline]
    pub fn n_limit(&self) -> Option<u64> {
        if self.max_n == 0 {
            None
        } else {
            Some(self.max_n)
        }
    }

    /// Returns the bus capacity, raised so that a run without retries fits in the ring.
    ///
    /// `start` publishes `RunStarted` and one `Pending` per unit in a single burst, and
    /// each unit then adds a `Running` and a terminal status. A ring smaller than that
    /// would make the listener lag and skip the oldest events of the run.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        let per_run = (self.worker_count.max(1) as usize)
            .saturating_mul(EVENTS_PER_UNIT)
            .saturating_add(RUN_EVENT_SLACK);
        self.bus_capacity.max(per_run)
    }
}

impl Default for Config {
    /// - `worker_count = 4`
    /// - `max_n = 1000`
    /// - `max_concurrent = 0` (unlimited)
    /// - `bus_capacity = 1024`
    /// - `unit_timeout = 0s` (none)
    /// - `retry = RetryPolicy::Never`
    /// - `backoff = BackoffPolicy::default()`
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKERS,
            max_n: DEFAULT_MAX_N,
            max_concurrent: 0,
            bus_capacity: 1024,
            unit_timeout: Duration::ZERO,
            retry: RetryPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}
