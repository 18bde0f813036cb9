use crate::domain::{
    FieldFilter, OrderBy, OrderDirection, QueryPlan, Recipe, RecipeField, RecipeId, StoredRecipe,
};
use crate::storage::recipes::RecipeStore;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-process document store keyed (and therefore default-ordered) by id.
#[derive(Debug, Default)]
pub struct MemoryRecipeStore {
    docs: RwLock<BTreeMap<RecipeId, Recipe>>,
}

impl MemoryRecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read, bypassing any plan.
    pub async fn get(&self, id: &RecipeId) -> Option<Recipe> {
        self.docs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn matches(recipe: &Recipe, filter: &FieldFilter) -> bool {
    match filter {
        FieldFilter::IsPublished(p) => recipe.is_published == *p,
        FieldFilter::Category(c) => recipe.category.as_str() == c,
    }
}

fn compare(a: &Recipe, b: &Recipe, order: &OrderBy) -> Ordering {
    let ord = match order.field {
        RecipeField::Name => a.name.cmp(&b.name),
        RecipeField::Category => a.category.as_str().cmp(b.category.as_str()),
        RecipeField::Directions => a.directions.cmp(&b.directions),
        RecipeField::PublishDate => a.publish_date.cmp(&b.publish_date),
        RecipeField::IsPublished => a.is_published.cmp(&b.is_published),
        RecipeField::ImageUrl => a.image_url.cmp(&b.image_url),
    };
    match order.direction {
        OrderDirection::Asc => ord,
        OrderDirection::Desc => ord.reverse(),
    }
}

#[async_trait]
impl RecipeStore for MemoryRecipeStore {
    async fn insert(&self, recipe: &Recipe) -> anyhow::Result<RecipeId> {
        let mut docs = self.docs.write().await;
        let mut id = RecipeId::generate();
        while docs.contains_key(&id) {
            id = RecipeId::generate();
        }
        docs.insert(id.clone(), recipe.clone());
        Ok(id)
    }

    async fn replace(&self, id: &RecipeId, recipe: &Recipe) -> anyhow::Result<Option<Recipe>> {
        Ok(self.docs.write().await.insert(id.clone(), recipe.clone()))
    }

    async fn remove(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>> {
        Ok(self.docs.write().await.remove(id))
    }

    async fn mark_published(&self, id: &RecipeId) -> anyhow::Result<Option<Recipe>> {
        let mut docs = self.docs.write().await;
        match docs.get_mut(id) {
            Some(recipe) if !recipe.is_published => {
                let before = recipe.clone();
                recipe.is_published = true;
                Ok(Some(before))
            }
            _ => Ok(None),
        }
    }

    async fn query(&self, plan: &QueryPlan) -> anyhow::Result<Vec<StoredRecipe>> {
        let docs = self.docs.read().await;
        let mut hits: Vec<StoredRecipe> = docs
            .iter()
            .filter(|(_, r)| plan.filters.iter().all(|f| matches(r, f)))
            .map(|(id, r)| StoredRecipe {
                id: id.clone(),
                recipe: r.clone(),
            })
            .collect();
        drop(docs);

        if let Some(order) = &plan.order_by {
            // stable: ties keep id order
            hits.sort_by(|a, b| compare(&a.recipe, &b.recipe, order));
        }

        let offset = plan.offset.unwrap_or(0) as usize;
        let limit = plan.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(hits.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, filters: &[FieldFilter]) -> anyhow::Result<u64> {
        let docs = self.docs.read().await;
        Ok(docs
            .values()
            .filter(|r| filters.iter().all(|f| matches(r, f)))
            .count() as u64)
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
