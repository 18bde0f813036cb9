//! Counter service: create-if-absent-else-increment under concurrency, seeding
//! and the bounded retry policy.

use async_trait::async_trait;
use recipe_catalog::app::counter_service::{CounterError, CounterOutcome};
use recipe_catalog::domain::CounterKey;
use recipe_catalog::storage::{CounterBackend, MemoryCounterBackend};
use recipe_catalog::{CounterPolicy, CounterService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

fn policy(max_attempts: u32) -> CounterPolicy {
    CounterPolicy {
        max_attempts,
        retry_backoff: Duration::from_millis(1),
    }
}

/// Holds the first `racers` reads until all of them have observed the record,
/// so every racer sees it absent and goes for the create.
struct RacingBackend {
    inner: MemoryCounterBackend,
    barrier: Barrier,
    racers: usize,
    reads: AtomicUsize,
}

impl RacingBackend {
    fn new(racers: usize) -> Self {
        Self {
            inner: MemoryCounterBackend::new(),
            barrier: Barrier::new(racers),
            racers,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CounterBackend for RacingBackend {
    async fn read(&self, key: CounterKey) -> anyhow::Result<Option<i64>> {
        let value = self.inner.read(key).await?;
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.racers {
            self.barrier.wait().await;
        }
        Ok(value)
    }

    async fn increment(&self, key: CounterKey, delta: i64) -> anyhow::Result<bool> {
        self.inner.increment(key, delta).await
    }

    async fn create_if_absent(&self, key: CounterKey, initial: i64) -> anyhow::Result<bool> {
        self.inner.create_if_absent(key, initial).await
    }

    async fn overwrite(&self, key: CounterKey, value: i64) -> anyhow::Result<()> {
        self.inner.overwrite(key, value).await
    }
}

/// Fails the first `failures` increments, then behaves.
struct FlakyBackend {
    inner: MemoryCounterBackend,
    failures: AtomicUsize,
}

#[async_trait]
impl CounterBackend for FlakyBackend {
    async fn read(&self, key: CounterKey) -> anyhow::Result<Option<i64>> {
        self.inner.read(key).await
    }

    async fn increment(&self, key: CounterKey, delta: i64) -> anyhow::Result<bool> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            anyhow::bail!("store unavailable");
        }
        self.inner.increment(key, delta).await
    }

    async fn create_if_absent(&self, key: CounterKey, initial: i64) -> anyhow::Result<bool> {
        self.inner.create_if_absent(key, initial).await
    }

    async fn overwrite(&self, key: CounterKey, value: i64) -> anyhow::Result<()> {
        self.inner.overwrite(key, value).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_events_do_not_lose_updates() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(RacingBackend::new(2));
    let service = Arc::new(CounterService::new(backend, policy(3)));

    let a = tokio::spawn({
        let service = service.clone();
        async move { service.apply_delta(CounterKey::All, 3).await }
    });
    let b = tokio::spawn({
        let service = service.clone();
        async move { service.apply_delta(CounterKey::All, 4).await }
    });
    let outcomes = [a.await??, b.await??];

    assert_eq!(service.value(CounterKey::All).await?, 7);
    let created = outcomes
        .iter()
        .filter(|o| matches!(o, CounterOutcome::Created { .. }))
        .count();
    assert_eq!(created, 1, "exactly one racer creates, the other increments: {outcomes:?}");
    assert!(outcomes.contains(&CounterOutcome::Incremented));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_deltas_converge() -> Result<(), Box<dyn std::error::Error>> {
    let service = Arc::new(CounterService::new(
        Arc::new(MemoryCounterBackend::new()),
        policy(3),
    ));

    let mut handles = Vec::new();
    for _ in 0..200 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.apply_delta(CounterKey::Published, 1).await
        }));
    }
    for handle in handles {
        handle.await??;
    }
    assert_eq!(service.value(CounterKey::Published).await?, 200);

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.apply_delta(CounterKey::Published, -1).await
        }));
    }
    for handle in handles {
        handle.await??;
    }
    assert_eq!(service.value(CounterKey::Published).await?, 150);
    Ok(())
}

#[tokio::test]
async fn absent_counter_is_seeded_from_delta() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(MemoryCounterBackend::new());
    let service = CounterService::new(backend.clone(), policy(3));

    assert_eq!(service.value(CounterKey::All).await?, 0);
    assert_eq!(backend.read(CounterKey::All).await?, None);

    let outcome = service.apply_delta(CounterKey::All, 1).await?;
    assert_eq!(outcome, CounterOutcome::Created { seed: 1 });
    assert_eq!(service.apply_delta(CounterKey::All, 1).await?, CounterOutcome::Incremented);
    assert_eq!(service.value(CounterKey::All).await?, 2);

    // A decrement against an absent record is kept, so the matching increment
    // arriving later cancels it out.
    let outcome = service.apply_delta(CounterKey::Published, -1).await?;
    assert_eq!(outcome, CounterOutcome::Created { seed: -1 });
    assert_eq!(backend.read(CounterKey::Published).await?, Some(-1));
    assert_eq!(service.value(CounterKey::Published).await?, 0);

    service.apply_delta(CounterKey::Published, 1).await?;
    assert_eq!(service.value(CounterKey::Published).await?, 0);
    service.apply_delta(CounterKey::Published, 1).await?;
    assert_eq!(service.value(CounterKey::Published).await?, 1);
    Ok(())
}

#[tokio::test]
async fn transient_failures_are_retried() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(FlakyBackend {
        inner: MemoryCounterBackend::new(),
        failures: AtomicUsize::new(2),
    });
    backend.inner.overwrite(CounterKey::All, 10).await?;
    let service = CounterService::new(backend, policy(3));

    service.apply_delta(CounterKey::All, -1).await?;
    assert_eq!(service.value(CounterKey::All).await?, 9);
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_report_failure() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(FlakyBackend {
        inner: MemoryCounterBackend::new(),
        failures: AtomicUsize::new(usize::MAX),
    });
    backend.inner.overwrite(CounterKey::All, 10).await?;
    let service = CounterService::new(backend, policy(4));

    match service.apply_delta(CounterKey::All, 1).await {
        Err(CounterError::Exhausted { key, delta, attempts, .. }) => {
            assert_eq!(key, CounterKey::All);
            assert_eq!(delta, 1);
            assert_eq!(attempts, 4);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(service.value(CounterKey::All).await?, 10);
    Ok(())
}

#[tokio::test]
async fn negative_drift_reads_as_zero() -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(MemoryCounterBackend::new());
    backend.overwrite(CounterKey::Published, -2).await?;
    let service = CounterService::new(backend, policy(1));

    assert_eq!(service.value(CounterKey::Published).await?, 0);
    service.apply_delta(CounterKey::Published, 3).await?;
    assert_eq!(service.value(CounterKey::Published).await?, 1);
    Ok(())
}
