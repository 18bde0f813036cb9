//! The catalog façade used by the HTTP handlers and the publish scheduler.
//!
//! Every accepted mutation is published on the change feed as a
//! [`DocumentEvent`]; counter maintenance happens downstream in the event
//! router, so a write returns before its counter adjustment lands.

use crate::app::counter_service::{CounterError, CounterService};
use crate::app::event_router::EventSender;
use crate::domain::query::QueryError;
use crate::domain::{
    plan, Caller, CounterKey, CounterSnapshot, DocumentEvent, FieldFilter, ListParams, QueryPlan,
    Recipe, RecipeId, StoredRecipe, ValidationError,
};
use crate::storage::RecipeStore;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("{0}")]
    Store(#[from] anyhow::Error),
}

impl From<CounterError> for CatalogError {
    fn from(e: CounterError) -> Self {
        CatalogError::Store(anyhow::Error::new(e))
    }
}

/// One page of a listing plus the counter for the caller's visibility class.
///
/// The count is read independently of the page and may briefly disagree with it.
#[derive(Debug, Clone)]
pub struct RecipePage {
    pub recipe_count: u64,
    pub documents: Vec<StoredRecipe>,
}

pub struct CatalogService {
    recipes: Arc<dyn RecipeStore>,
    counters: Arc<CounterService>,
    events: EventSender,
}

impl CatalogService {
    pub fn new(recipes: Arc<dyn RecipeStore>, counters: Arc<CounterService>, events: EventSender) -> Self {
        Self {
            recipes,
            counters,
            events,
        }
    }

    fn publish_event(&self, event: DocumentEvent) {
        let id = event.id().clone();
        if self.events.send(event).is_err() {
            // Only happens once the router is gone during shutdown.
            error!(recipe_id = %id, "change feed closed, counter event lost");
        }
    }

    pub async fn create(&self, recipe: Recipe) -> Result<RecipeId, CatalogError> {
        let id = self.recipes.insert(&recipe).await?;
        info!(recipe_id = %id, published = recipe.is_published, "recipe created");
        self.publish_event(DocumentEvent::Created {
            id: id.clone(),
            after: recipe,
        });
        Ok(id)
    }

    /// Writes `recipe` under `id`; an unknown id is created.
    pub async fn replace(&self, id: &RecipeId, recipe: Recipe) -> Result<(), CatalogError> {
        let previous = self.recipes.replace(id, &recipe).await?;
        let event = match previous {
            Some(before) => {
                info!(recipe_id = %id, "recipe updated");
                DocumentEvent::Updated {
                    id: id.clone(),
                    before,
                    after: recipe,
                }
            }
            None => {
                info!(recipe_id = %id, "recipe created by replace");
                DocumentEvent::Created {
                    id: id.clone(),
                    after: recipe,
                }
            }
        };
        self.publish_event(event);
        Ok(())
    }

    /// Removes a recipe. Deleting an unknown id succeeds without an event.
    pub async fn delete(&self, id: &RecipeId) -> Result<(), CatalogError> {
        if let Some(before) = self.recipes.remove(id).await? {
            info!(recipe_id = %id, "recipe deleted");
            self.publish_event(DocumentEvent::Deleted {
                id: id.clone(),
                before,
            });
        }
        Ok(())
    }

    pub async fn list(&self, caller: &Caller, params: &ListParams) -> Result<RecipePage, CatalogError> {
        let (query, counter_key) = plan(caller, params)?;
        let recipe_count = self.counters.value(counter_key).await?;
        let documents = self.recipes.query(&query).await?;
        Ok(RecipePage {
            recipe_count,
            documents,
        })
    }

    /// Recipes still waiting to be published.
    pub async fn unpublished(&self) -> Result<Vec<StoredRecipe>, CatalogError> {
        Ok(self.recipes.query(&QueryPlan::unpublished()).await?)
    }

    /// Flips `id` to published if it still is unpublished.
    ///
    /// Returns `false` when there was nothing to flip.
    pub async fn publish(&self, id: &RecipeId) -> Result<bool, CatalogError> {
        let Some(before) = self.recipes.mark_published(id).await? else {
            return Ok(false);
        };
        let mut after = before.clone();
        after.is_published = true;
        info!(recipe_id = %id, name = %after.name, "recipe is now published");
        self.publish_event(DocumentEvent::Updated {
            id: id.clone(),
            before,
            after,
        });
        Ok(true)
    }

    pub async fn counters(&self) -> Result<CounterSnapshot, CatalogError> {
        Ok(self.counters.snapshot().await?)
    }

    /// Recounts both counters from the store and overwrites them.
    ///
    /// Events still in flight while this runs are applied on top of the
    /// recount, so run it while the catalog is quiet.
    pub async fn reconcile_counters(&self) -> Result<CounterSnapshot, CatalogError> {
        let CounterSnapshot { all, published } = self.actual_counts().await?;

        let before = self.counters.snapshot().await?;
        self.counters.overwrite(CounterKey::All, all).await?;
        self.counters.overwrite(CounterKey::Published, published).await?;

        let after = CounterSnapshot { all, published };
        if before != after {
            info!(?before, ?after, "counters reconciled with drift");
        } else {
            info!(?after, "counters reconciled, no drift");
        }
        Ok(after)
    }

    /// Counts straight from the store, bypassing the counter records.
    pub async fn actual_counts(&self) -> Result<CounterSnapshot, CatalogError> {
        Ok(CounterSnapshot {
            all: self.recipes.count(&[]).await?,
            published: self
                .recipes
                .count(&[FieldFilter::IsPublished(true)])
                .await?,
        })
    }

    pub async fn ping(&self) -> Result<(), CatalogError> {
        Ok(self.recipes.ping().await?)
    }
}
