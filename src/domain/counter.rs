//! Counter keys for the denormalized recipe counts.

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Visibility class a counter tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKey {
    /// Every recipe document.
    All,
    /// Recipes with `is_published == true`.
    Published,
}

impl CounterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKey::All => "all",
            CounterKey::Published => "published",
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time values of both counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct CounterSnapshot {
    pub all: u64,
    pub published: u64,
}
