//! Counter records in the `recipe_counts` table.

use crate::domain::CounterKey;
use crate::storage::counters::CounterBackend;
use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PostgresCounterBackend {
    pool: PgPool,
}

impl PostgresCounterBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CounterBackend for PostgresCounterBackend {
    async fn read(&self, key: CounterKey) -> anyhow::Result<Option<i64>> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM recipe_counts WHERE key = $1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn increment(&self, key: CounterKey, delta: i64) -> anyhow::Result<bool> {
        // Single-row UPDATE with `value = value + $2` is applied under the row lock.
        let result = sqlx::query("UPDATE recipe_counts SET value = value + $2 WHERE key = $1")
            .bind(key.as_str())
            .bind(delta)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn create_if_absent(&self, key: CounterKey, initial: i64) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO recipe_counts (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(key.as_str())
        .bind(initial)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn overwrite(&self, key: CounterKey, value: i64) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO recipe_counts (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = $2",
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
