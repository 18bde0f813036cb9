//! Persistence: recipe documents, counter records and the PostgreSQL schema.

pub mod counters;
pub mod postgres;
pub mod recipes;

pub use counters::{CounterBackend, MemoryCounterBackend, PostgresCounterBackend};
pub use recipes::{MemoryRecipeStore, PostgresRecipeStore, RecipeStore};
