//! # Fault injection strategies.
//!
//! [`ProductExecutor`](crate::ProductExecutor) asks its [`FaultPolicy`] for a [`FaultPlan`]
//! before each attempt: how long to stall and whether to fail afterwards. Production
//! code uses [`NoFaults`]; chaos runs and tests plug in [`RandomFaults`] or
//! [`ScriptedFaults`] through the same executor.
//!
//! ```text
//! attempt ──► policy.plan(unit, attempt) ──► sleep(latency) ──► fail? ──► compute
//! ```

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::units::WorkUnit;

/// What to do to one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Artificial latency before the attempt proceeds.
    pub latency: Duration,
    /// If set, the attempt fails with this message after the latency.
    pub failure: Option<String>,
}

/// Strategy deciding which attempts stall or fail.
pub trait FaultPolicy: Send + Sync + 'static {
    fn plan(&self, unit: &WorkUnit, attempt: u32) -> FaultPlan;
}

/// No latency, no failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultPolicy for NoFaults {
    fn plan(&self, _unit: &WorkUnit, _attempt: u32) -> FaultPlan {
        FaultPlan::default()
    }
}

/// Uniform random latency and a fixed failure probability per attempt.
///
/// With a seed the sequence of plans is reproducible for a given call order.
pub struct RandomFaults {
    failure_rate: f64,
    latency_ms: RangeInclusive<u64>,
    rng: Mutex<StdRng>,
}

impl RandomFaults {
    /// Failure rate is clamped to `[0, 1]`; bounds of the latency range are reordered if needed.
    pub fn new(failure_rate: f64, min_latency: Duration, max_latency: Duration) -> Self {
        Self::with_rng(
            failure_rate,
            min_latency,
            max_latency,
            StdRng::from_os_rng(),
        )
    }

    /// Same as [`RandomFaults::new`] with a deterministic seed.
    pub fn seeded(
        failure_rate: f64,
        min_latency: Duration,
        max_latency: Duration,
        seed: u64,
    ) -> Self {
        Self::with_rng(
            failure_rate,
            min_latency,
            max_latency,
            StdRng::seed_from_u64(seed),
        )
    }

    /// The classic demo settings: 5% failures, 1 to 3 s latency.
    pub fn legacy() -> Self {
        Self::new(0.05, Duration::from_millis(1000), Duration::from_millis(3000))
    }

    fn with_rng(failure_rate: f64, min: Duration, max: Duration, rng: StdRng) -> Self {
        let rate = if failure_rate.is_nan() {
            0.0
        } else {
            failure_rate.clamp(0.0, 1.0)
        };
        let (lo, hi) = (duration_ms(min), duration_ms(max));
        Self {
            failure_rate: rate,
            latency_ms: lo.min(hi)..=lo.max(hi),
            rng: Mutex::new(rng),
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }
}

impl FaultPolicy for RandomFaults {
    fn plan(&self, unit: &WorkUnit, _attempt: u32) -> FaultPlan {
        let mut rng = self.rng.lock();
        let latency = Duration::from_millis(rng.random_range(self.latency_ms.clone()));
        let failure = rng
            .random_bool(self.failure_rate)
            .then(|| format!("worker {} encountered an error", unit.id()));
        FaultPlan { latency, failure }
    }
}

/// Deterministic faults keyed by unit id.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use rangefold::{FaultPolicy, ScriptedFaults, WorkUnit};
///
/// let faults = ScriptedFaults::new()
///     .fail_unit(2)
///     .delay_unit(3, Duration::from_millis(20));
///
/// let two = WorkUnit::new(2, 3, 4).unwrap();
/// assert!(faults.plan(&two, 1).failure.is_some());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    always: HashSet<u32>,
    first_attempts: HashMap<u32, u32>,
    latency: HashMap<u32, Duration>,
}

impl ScriptedFaults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every attempt on `unit` fails.
    #[must_use]
    pub fn fail_unit(mut self, unit: u32) -> Self {
        self.always.insert(unit);
        self
    }

    /// The first `attempts` attempts on `unit` fail; later ones succeed.
    #[must_use]
    pub fn fail_first(mut self, unit: u32, attempts: u32) -> Self {
        self.first_attempts.insert(unit, attempts);
        self
    }

    /// Every attempt on `unit` stalls for `latency` first.
    #[must_use]
    pub fn delay_unit(mut self, unit: u32, latency: Duration) -> Self {
        self.latency.insert(unit, latency);
        self
    }
}

impl FaultPolicy for ScriptedFaults {
    fn plan(&self, unit: &WorkUnit, attempt: u32) -> FaultPlan {
        let id = unit.id();
        let fails = self.always.contains(&id)
            || self
                .first_attempts
                .get(&id)
                .is_some_and(|&n| attempt <= n);
        FaultPlan {
            latency: self.latency.get(&id).copied().unwrap_or_default(),
            failure: fails.then(|| format!("worker {id} encountered an error")),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u32) -> WorkUnit {
        WorkUnit::new(id, u64::from(id), u64::from(id)).unwrap()
    }

    #[test]
    fn seeded_plans_are_reproducible() {
        let a = RandomFaults::seeded(0.5, Duration::from_millis(1), Duration::from_millis(50), 7);
        let b = RandomFaults::seeded(0.5, Duration::from_millis(1), Duration::from_millis(50), 7);
        for id in 1..=20 {
            assert_eq!(a.plan(&unit(id), 1), b.plan(&unit(id), 1));
        }
    }

    #[test]
    fn latency_within_bounds_and_rate_extremes() {
        let never = RandomFaults::seeded(0.0, Duration::from_millis(30), Duration::from_millis(10), 1);
        let always = RandomFaults::seeded(7.0, Duration::ZERO, Duration::ZERO, 1);
        for id in 1..=50 {
            let plan = never.plan(&unit(id), 1);
            assert!(plan.failure.is_none());
            assert!((10..=30).contains(&plan.latency.as_millis()));
            assert!(always.plan(&unit(id), 1).failure.is_some());
        }
        assert_eq!(always.failure_rate(), 1.0);
    }

    #[test]
    fn scripted_first_attempts_then_recovers() {
        let faults = ScriptedFaults::new().fail_first(1, 2);
        assert!(faults.plan(&unit(1), 1).failure.is_some());
        assert!(faults.plan(&unit(1), 2).failure.is_some());
        assert!(faults.plan(&unit(1), 3).failure.is_none());
        assert_eq!(faults.plan(&unit(2), 1), FaultPlan::default());
    }
}
