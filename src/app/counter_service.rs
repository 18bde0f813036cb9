//! Aggregate counter service.
//!
//! Applies deltas to the `all` / `published` counters with
//! create-if-absent-else-increment semantics:
//!
//! 1. Read the record.
//! 2. Present: atomic increment through the backend.
//! 3. Absent: conditional create seeded with `delta` itself. A writer that
//!    loses the create race increments instead, so concurrent first events
//!    are never dropped.
//!
//! The seed is not clamped: a decrement that lands before its matching
//! increment leaves the record negative until the increment arrives, keeping
//! deltas commutative. Reads clamp at zero.
//!
//! Backend errors are retried with a fixed backoff up to `max_attempts`.

use crate::domain::{CounterKey, CounterSnapshot};
use crate::storage::CounterBackend;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct CounterPolicy {
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for CounterPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

/// How a successful `apply_delta` landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterOutcome {
    Incremented,
    Created { seed: i64 },
}

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter '{key}' delta {delta} not applied after {attempts} attempts: {last_error}")]
    Exhausted {
        key: CounterKey,
        delta: i64,
        attempts: u32,
        last_error: String,
    },
    #[error("counter '{key}' unreadable: {source}")]
    Read {
        key: CounterKey,
        #[source]
        source: anyhow::Error,
    },
}

pub struct CounterService {
    backend: Arc<dyn CounterBackend>,
    policy: CounterPolicy,
}

impl CounterService {
    pub fn new(backend: Arc<dyn CounterBackend>, policy: CounterPolicy) -> Self {
        Self { backend, policy }
    }

    /// Adjusts `key` by `delta`. Once this returns `Ok`, the change is visible
    /// to subsequent reads.
    pub async fn apply_delta(&self, key: CounterKey, delta: i64) -> Result<CounterOutcome, CounterError> {
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.policy.max_attempts {
            match self.try_apply(key, delta).await {
                Ok(Some(outcome)) => {
                    debug!(counter = %key, delta, attempt, ?outcome, "counter updated");
                    return Ok(outcome);
                }
                // Lost a create race or the record vanished; retry immediately.
                Ok(None) => {
                    last_error = "record changed between read and write".to_string();
                    continue;
                }
                Err(e) => {
                    warn!(counter = %key, delta, attempt, error = %e, "counter update failed");
                    last_error = e.to_string();
                    if attempt < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.retry_backoff).await;
                    }
                }
            }
        }

        Err(CounterError::Exhausted {
            key,
            delta,
            attempts: self.policy.max_attempts,
            last_error,
        })
    }

    async fn try_apply(&self, key: CounterKey, delta: i64) -> anyhow::Result<Option<CounterOutcome>> {
        if self.backend.read(key).await?.is_some() {
            return Ok(self
                .backend
                .increment(key, delta)
                .await?
                .then_some(CounterOutcome::Incremented));
        }

        let seed = delta;
        if self.backend.create_if_absent(key, seed).await? {
            return Ok(Some(CounterOutcome::Created { seed }));
        }

        debug!(counter = %key, delta, "lost counter create race, retrying as increment");
        Ok(self
            .backend
            .increment(key, delta)
            .await?
            .then_some(CounterOutcome::Incremented))
    }

    /// Current value; an absent record reads as zero and negative drift clamps to zero.
    pub async fn value(&self, key: CounterKey) -> Result<u64, CounterError> {
        let raw = self
            .backend
            .read(key)
            .await
            .map_err(|source| CounterError::Read { key, source })?;
        Ok(raw.unwrap_or(0).max(0) as u64)
    }

    pub async fn snapshot(&self) -> Result<CounterSnapshot, CounterError> {
        Ok(CounterSnapshot {
            all: self.value(CounterKey::All).await?,
            published: self.value(CounterKey::Published).await?,
        })
    }

    /// Sets a counter outright. Only reconciliation uses this.
    pub async fn overwrite(&self, key: CounterKey, value: u64) -> anyhow::Result<()> {
        let value = i64::try_from(value)?;
        self.backend.overwrite(key, value).await
    }
}
