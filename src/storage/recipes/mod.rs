//! Recipe document stores.

use crate::domain::{FieldFilter, QueryPlan, Recipe, RecipeId, StoredRecipe};
use async_trait::async_trait;

pub mod memory;
pub mod postgres;

pub use memory::MemoryRecipeStore;
pub use postgres::PostgresRecipeStore;

/// The document store collaborator.
///
/// Mutations report the document state they replaced so the caller can
/// publish the matching lifecycle event.
#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Inserts a new document under a freshly generated id.
    async fn insert(&self, recipe: &Recipe) -> anyhow::Result<RecipeId>;

    /// Writes `recipe` under `id`, creating the document if needed.
    ///
    /// Returns the previous document, or `None` if this call created it.
    async fn replace(&self, id: &RecipeId, recipe: &Recipe) -> anyhow::Result<Option<Recipe>>;

    /// Removes the document. Returns what was removed, `None` if it did not exist.
    async fn remove(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>>;

    /// Sets `is_published = true` if the document exists and is unpublished.
    ///
    /// Returns the document as it was before the flip, or `None` when nothing
    /// changed (already published, or gone).
    async fn mark_published(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>>;

    /// Executes a listing plan. Without an ordering, documents come back by id.
    async fn query(&self, plan: &QueryPlan) -> anyhow::Result<Vec<StoredRecipe>>;

    /// Counts documents matching every filter.
    async fn count(&self, filters: &[FieldFilter]) -> anyhow::Result<u64>;

    /// Cheap reachability check.
    async fn ping(&self) -> anyhow::Result<()>;
}
