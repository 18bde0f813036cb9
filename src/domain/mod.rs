//! Domain types for the recipe catalog: documents, lifecycle events, counters
//! and the listing query planner.

pub mod counter;
pub mod event;
pub mod query;
pub mod recipe;

pub use counter::{CounterKey, CounterSnapshot};
pub use event::{DocumentEvent, EventKind};
pub use query::{plan, Caller, FieldFilter, ListParams, OrderBy, OrderDirection, QueryPlan, RecipeField};
pub use recipe::{Category, Recipe, RecipeId, StoredRecipe, ValidationError};
