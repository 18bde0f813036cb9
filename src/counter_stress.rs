// src/counter_stress.rs
// Fires concurrent deltas at the configured counter backend and checks that
// no update was lost, including the racy first write to an absent record.
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;

use recipe_catalog::domain::CounterKey;
use recipe_catalog::infra::config::StoreBackend;
use recipe_catalog::infra::telemetry;
use recipe_catalog::storage::{postgres, CounterBackend, MemoryCounterBackend, PostgresCounterBackend};
use recipe_catalog::{Config, CounterPolicy, CounterService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let config = Config::from_env()?;

    let num_tasks: usize = std::env::args()
        .nth(1)
        .and_then(|a| a.parse().ok())
        .unwrap_or(1_000);

    let backend: Arc<dyn CounterBackend> = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = postgres::connect(config.require_database_url()?, config.db_max_connections).await?;
            // Start from an absent record so the create race is exercised.
            sqlx::query("DELETE FROM recipe_counts WHERE key = $1")
                .bind(CounterKey::All.as_str())
                .execute(&pool)
                .await?;
            Arc::new(PostgresCounterBackend::new(pool))
        }
        StoreBackend::Memory => Arc::new(MemoryCounterBackend::new()),
    };

    let service = Arc::new(CounterService::new(
        backend,
        CounterPolicy {
            max_attempts: config.counter_max_attempts,
            retry_backoff: config.counter_retry_backoff,
        },
    ));

    println!("--- Counter stress: {} concurrent deltas against '{}' ---", num_tasks, CounterKey::All);

    // The first wave races to create the absent record; the second mixes in decrements.
    const CREATE_WAVE: usize = 8;
    let mut rng = rand::thread_rng();
    let deltas: Vec<i64> = (0..num_tasks.max(CREATE_WAVE))
        .map(|i| if i < CREATE_WAVE || rng.gen_bool(0.8) { 1 } else { -1 })
        .collect();
    let expected: i64 = deltas.iter().sum();

    let start_time = Instant::now();
    let mut failures = 0usize;
    for wave in [&deltas[..CREATE_WAVE], &deltas[CREATE_WAVE..]] {
        let mut handles = Vec::with_capacity(wave.len());
        for &delta in wave {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.apply_delta(CounterKey::All, delta).await
            }));
        }
        for handle in handles {
            if handle.await?.is_err() {
                failures += 1;
            }
        }
    }
    let duration = start_time.elapsed();

    let actual = service.value(CounterKey::All).await?;
    println!("\n--- Results ---");
    println!("Applied {} deltas in: {:?}", deltas.len(), duration);
    println!("Expected value: {}", expected.max(0));
    println!("Actual value:   {}", actual);
    println!("Dropped deltas: {}", failures);

    if failures == 0 && actual as i64 != expected.max(0) {
        anyhow::bail!("lost updates detected");
    }
    Ok(())
}
