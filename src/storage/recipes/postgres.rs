//! Recipe documents in the `recipes` table.

use crate::domain::{
    Category, FieldFilter, OrderDirection, QueryPlan, Recipe, RecipeId, StoredRecipe,
};
use crate::storage::recipes::RecipeStore;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

const COLUMNS: &str =
    "id, name, category, directions, ingredients, publish_date, is_published, image_url";

/// Attempts before giving up on a replace that keeps losing insert races.
const REPLACE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct PostgresRecipeStore {
    pool: PgPool,
}

impl PostgresRecipeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_recipe(row: &PgRow) -> anyhow::Result<Recipe> {
    let category: String = row.try_get("category")?;
    Ok(Recipe {
        name: row.try_get("name")?,
        category: category.parse::<Category>().map_err(|e| anyhow!(e))?,
        directions: row.try_get("directions")?,
        ingredients: row.try_get::<Vec<String>, _>("ingredients")?,
        publish_date: row.try_get::<DateTime<Utc>, _>("publish_date")?,
        is_published: row.try_get("is_published")?,
        image_url: row.try_get("image_url")?,
    })
}

fn row_to_stored(row: &PgRow) -> anyhow::Result<StoredRecipe> {
    let id: String = row.try_get("id")?;
    Ok(StoredRecipe {
        id: RecipeId::new(id),
        recipe: row_to_recipe(row)?,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &[FieldFilter]) {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            FieldFilter::IsPublished(p) => {
                qb.push("is_published = ").push_bind(*p);
            }
            FieldFilter::Category(c) => {
                qb.push("category = ").push_bind(c.clone());
            }
        }
    }
}

#[async_trait]
impl RecipeStore for PostgresRecipeStore {
    async fn insert(&self, recipe: &Recipe) -> anyhow::Result<RecipeId> {
        let id = RecipeId::generate();
        sqlx::query(
            "INSERT INTO recipes (id, name, category, directions, ingredients, publish_date, is_published, image_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id.as_str())
        .bind(&recipe.name)
        .bind(recipe.category.as_str())
        .bind(&recipe.directions)
        .bind(&recipe.ingredients)
        .bind(recipe.publish_date)
        .bind(recipe.is_published)
        .bind(&recipe.image_url)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn replace(&self, id: &RecipeId, recipe: &Recipe) -> anyhow::Result<Option<Recipe>> {
        for _ in 0..REPLACE_ATTEMPTS {
            let mut tx = self.pool.begin().await?;

            let existing = sqlx::query(&format!(
                "SELECT {} FROM recipes WHERE id = $1 FOR UPDATE",
                COLUMNS
            ))
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            if let Some(row) = existing {
                let before = row_to_recipe(&row)?;
                sqlx::query(
                    "UPDATE recipes SET name = $2, category = $3, directions = $4, ingredients = $5,
                        publish_date = $6, is_published = $7, image_url = $8
                     WHERE id = $1",
                )
                .bind(id.as_str())
                .bind(&recipe.name)
                .bind(recipe.category.as_str())
                .bind(&recipe.directions)
                .bind(&recipe.ingredients)
                .bind(recipe.publish_date)
                .bind(recipe.is_published)
                .bind(&recipe.image_url)
                .execute(&mut *tx)
                .await?;
                tx.commit().await?;
                return Ok(Some(before));
            }

            // No row to lock: a concurrent writer may create the same id, so the
            // insert must be conditional. Losing means the next pass finds the row.
            let inserted = sqlx::query(
                "INSERT INTO recipes (id, name, category, directions, ingredients, publish_date, is_published, image_url)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(id.as_str())
            .bind(&recipe.name)
            .bind(recipe.category.as_str())
            .bind(&recipe.directions)
            .bind(&recipe.ingredients)
            .bind(recipe.publish_date)
            .bind(recipe.is_published)
            .bind(&recipe.image_url)
            .execute(&mut *tx)
            .await?;
            tx.commit().await?;

            if inserted.rows_affected() == 1 {
                return Ok(None);
            }
        }
        Err(anyhow!(
            "replace of recipe {} kept racing concurrent creates",
            id
        ))
    }

    async fn remove(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query(&format!(
            "DELETE FROM recipes WHERE id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_recipe).transpose()
    }

    async fn mark_published(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>> {
        // The guard on is_published makes the flip happen at most once.
        let row = sqlx::query(&format!(
            "UPDATE recipes SET is_published = TRUE
             WHERE id = $1 AND is_published = FALSE
             RETURNING {}",
            COLUMNS
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let mut before = row_to_recipe(&row)?;
                before.is_published = false;
                Ok(Some(before))
            }
            None => Ok(None),
        }
    }

    async fn query(&self, plan: &QueryPlan) -> anyhow::Result<Vec<StoredRecipe>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        qb.push(COLUMNS).push(" FROM recipes");
        push_filters(&mut qb, &plan.filters);

        qb.push(" ORDER BY ");
        if let Some(order) = &plan.order_by {
            let nulls = match order.direction {
                OrderDirection::Asc => "NULLS FIRST",
                OrderDirection::Desc => "NULLS LAST",
            };
            qb.push(order.field.column())
                .push(" ")
                .push(order.direction.to_string())
                .push(" ")
                .push(nulls)
                .push(", ");
        }
        qb.push("id ASC");

        if let Some(limit) = plan.limit {
            qb.push(" LIMIT ").push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if let Some(offset) = plan.offset {
            qb.push(" OFFSET ").push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
        }

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_stored).collect()
    }

    async fn count(&self, filters: &[FieldFilter]) -> anyhow::Result<u64> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM recipes");
        push_filters(&mut qb, filters);
        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
