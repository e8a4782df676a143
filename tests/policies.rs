//! Timeouts, retries, the concurrency cap and subscriber isolation.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use common::{Harness, of_kind, product, statuses};
use rangefold::{
    BackoffPolicy, Config, Event, EventKind, ExecutorFn, FailureKind, JitterPolicy, RetryPolicy,
    RunOutcome, ScriptedFaults, Subscribe, UnitError, UnitStatus, WorkUnit, range_product,
};
use tokio_util::sync::CancellationToken;

fn quick_backoff() -> BackoffPolicy {
    BackoffPolicy {
        first: Duration::from_millis(1),
        max: Duration::from_millis(5),
        factor: 2.0,
        jitter: JitterPolicy::None,
    }
}

#[tokio::test]
async fn slow_unit_times_out() {
    let cfg = Config {
        unit_timeout: Duration::from_millis(30),
        ..Config::default()
    };
    let faults = ScriptedFaults::new().delay_unit(1, Duration::from_secs(5));
    let h = Harness::new(cfg, product(faults));

    match h.coordinator.start(10).unwrap().wait().await {
        RunOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Timeout);
            assert_eq!(failure.unit, Some(1));
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let events = h.finish().await;
    let timeout_at = events
        .iter()
        .position(|e| e.kind == EventKind::TimeoutHit)
        .unwrap();
    let failed_at = events
        .iter()
        .position(|e| e.kind == EventKind::RunFailed)
        .unwrap();
    assert!(timeout_at < failed_at);
    assert_eq!(events[timeout_at].unit, Some(1));
    assert_eq!(events[timeout_at].timeout_ms, Some(30));
}

#[tokio::test]
async fn flaky_unit_recovers_with_retry() {
    let cfg = Config {
        retry: RetryPolicy::OnFailure { max_attempts: 3 },
        backoff: quick_backoff(),
        ..Config::default()
    };
    let h = Harness::new(cfg, product(ScriptedFaults::new().fail_first(3, 2)));

    let outcome = h.coordinator.start(10).unwrap().wait().await;
    assert_eq!(outcome.value().map(|v| v.to_string()).as_deref(), Some("3628800"));
    assert_eq!(h.coordinator.snapshot().slot(3).map(|s| s.attempts), Some(3));

    let events = h.finish().await;
    let retries = of_kind(&events, EventKind::RetryScheduled);
    assert_eq!(retries.len(), 2);
    assert!(retries.iter().all(|e| e.unit == Some(3)));
    assert_eq!(
        retries.iter().map(|e| e.attempt).collect::<Vec<_>>(),
        vec![Some(1), Some(2)]
    );
    assert_eq!(
        statuses(&events, 3),
        vec![
            UnitStatus::Pending,
            UnitStatus::Running,
            UnitStatus::Running,
            UnitStatus::Running,
            UnitStatus::Succeeded
        ]
    );
}

#[tokio::test]
async fn retries_are_bounded() {
    let cfg = Config {
        retry: RetryPolicy::OnFailure { max_attempts: 2 },
        backoff: quick_backoff(),
        ..Config::default()
    };
    let h = Harness::new(cfg, product(ScriptedFaults::new().fail_unit(2)));

    match h.coordinator.start(10).unwrap().wait().await {
        RunOutcome::Failed(failure) => assert_eq!(failure.unit, Some(2)),
        other => panic!("unexpected outcome {other:?}"),
    }
    let events = h.finish().await;
    assert_eq!(of_kind(&events, EventKind::RetryScheduled).len(), 1);
}

#[tokio::test]
async fn fatal_errors_are_not_retried() {
    let cfg = Config {
        retry: RetryPolicy::OnFailure { max_attempts: 5 },
        backoff: quick_backoff(),
        ..Config::default()
    };
    let exec = ExecutorFn::arc(
        "fatal",
        |_unit: WorkUnit, _attempt: u32, _ctx: CancellationToken| async move {
            Err::<num_bigint::BigUint, _>(UnitError::Fatal {
                error: "out of memory".into(),
            })
        },
    );
    let h = Harness::new(cfg, exec);

    match h.coordinator.start(4).unwrap().wait().await {
        RunOutcome::Failed(failure) => {
            assert_eq!(failure.kind, FailureKind::Executor);
            assert!(failure.message.ends_with("out of memory"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let events = h.finish().await;
    assert!(of_kind(&events, EventKind::RetryScheduled).is_empty());
}

#[tokio::test]
async fn concurrency_cap_is_respected() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (current, highest) = (in_flight.clone(), peak.clone());

    let exec = ExecutorFn::arc(
        "counted",
        move |unit: WorkUnit, _attempt: u32, _ctx: CancellationToken| {
            let current = current.clone();
            let highest = highest.clone();
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                highest.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, UnitError>(range_product(unit.start(), unit.end()))
            }
        },
    );
    let cfg = Config {
        worker_count: 6,
        max_concurrent: 2,
        ..Config::default()
    };
    let h = Harness::new(cfg, exec);

    let outcome = h.coordinator.start(30).unwrap().wait().await;
    assert_eq!(outcome.value(), Some(&range_product(1, 30)));
    assert!(peak.load(Ordering::SeqCst) <= 2);
    h.finish().await;
}

struct Grumpy;

#[async_trait]
impl Subscribe for Grumpy {
    async fn on_event(&self, event: &Event) {
        if event.kind == EventKind::RunStarted {
            panic!("grumpy subscriber");
        }
    }

    fn name(&self) -> &'static str {
        "grumpy"
    }
}

#[tokio::test]
async fn panicking_subscriber_does_not_affect_the_run() {
    let extra: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Grumpy)];
    let h = Harness::with_extra(Config::default(), product(ScriptedFaults::new()), extra);

    let outcome = h.coordinator.start(12).unwrap().wait().await;
    assert_eq!(outcome.value().map(|v| v.to_string()).as_deref(), Some("479001600"));
    tokio::time::sleep(Duration::from_millis(50)).await;

    let events = h.finish().await;
    let panicked = of_kind(&events, EventKind::SubscriberPanicked);
    assert_eq!(panicked.len(), 1);
    assert_eq!(panicked[0].subscriber, Some("grumpy"));
    assert_eq!(of_kind(&events, EventKind::RunCompleted).len(), 1);
}

/// Takes its time over every event and queues at most one.
struct Sluggish {
    seen: Arc<Mutex<Vec<EventKind>>>,
}

#[async_trait]
impl Subscribe for Sluggish {
    async fn on_event(&self, event: &Event) {
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.seen.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "sluggish"
    }

    fn queue_capacity(&self) -> usize {
        1
    }
}

#[tokio::test]
async fn slow_subscriber_still_sees_the_outcome() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let extra: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Sluggish { seen: seen.clone() })];
    let cfg = Config {
        worker_count: 10,
        ..Config::default()
    };
    let h = Harness::with_extra(cfg, product(ScriptedFaults::new()), extra);

    let outcome = h.coordinator.start(100).unwrap().wait().await;
    assert_eq!(outcome.value(), Some(&range_product(1, 100)));
    let events = h.finish().await;

    let seen = seen.lock().clone();
    let run_level: Vec<EventKind> = seen
        .iter()
        .copied()
        .filter(|k| {
            matches!(
                k,
                EventKind::RunStarted | EventKind::RunCompleted | EventKind::RunReset
            )
        })
        .collect();
    assert_eq!(
        run_level,
        vec![EventKind::RunStarted, EventKind::RunCompleted, EventKind::RunReset]
    );
    // The recorder's larger queue kept the unit churn the slow subscriber lost.
    assert!(seen.len() < events.len());
    assert!(!of_kind(&events, EventKind::SubscriberOverflow).is_empty());
}
