//! Counter record backends.
//!
//! [`CounterBackend`] is the only place the catalog relies on atomicity from
//! the underlying store: a conditional create and a native atomic increment.
//! The create-if-absent-else-increment protocol built on top lives in
//! `app::counter_service`.

use crate::domain::CounterKey;
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::MemoryCounterBackend;
pub use postgres::PostgresCounterBackend;

#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// Current persisted value, or `None` if the record does not exist yet.
    async fn read(&self, key: CounterKey) -> anyhow::Result<Option<i64>>;

    /// Atomically adds `delta` to an existing record.
    ///
    /// Returns `false` when the record does not exist; nothing is written then.
    async fn increment(&self, key: CounterKey, delta: i64) -> anyhow::Result<bool>;

    /// Creates the record with `initial` unless it already exists.
    ///
    /// Returns `false` when another writer created it first.
    async fn create_if_absent(&self, key: CounterKey, initial: i64) -> anyhow::Result<bool>;

    /// Unconditionally sets the record. Reconciliation only.
    async fn overwrite(&self, key: CounterKey, value: i64) -> anyhow::Result<()>;
}
