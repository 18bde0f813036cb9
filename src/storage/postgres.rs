//! PostgreSQL connection pool and schema bootstrap.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Connects to `database_url` and makes sure the catalog tables exist.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            directions TEXT NOT NULL,
            ingredients TEXT[] NOT NULL,
            publish_date TIMESTAMPTZ NOT NULL,
            is_published BOOLEAN NOT NULL,
            image_url TEXT
        )",
    )
    .execute(pool)
    .await?;

    // The scheduler scans unpublished recipes daily.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS recipes_unpublished_idx
            ON recipes (publish_date) WHERE is_published = FALSE",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS recipe_counts (
            key TEXT PRIMARY KEY,
            value BIGINT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    info!("catalog schema ready");
    Ok(())
}
