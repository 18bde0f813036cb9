//! Document lifecycle events published on the change feed.

use crate::domain::recipe::{Recipe, RecipeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
}

/// One accepted mutation of a recipe document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    Created { id: RecipeId, after: Recipe },
    Updated { id: RecipeId, before: Recipe, after: Recipe },
    Deleted { id: RecipeId, before: Recipe },
}

impl DocumentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DocumentEvent::Created { .. } => EventKind::Created,
            DocumentEvent::Updated { .. } => EventKind::Updated,
            DocumentEvent::Deleted { .. } => EventKind::Deleted,
        }
    }

    pub fn id(&self) -> &RecipeId {
        match self {
            DocumentEvent::Created { id, .. }
            | DocumentEvent::Updated { id, .. }
            | DocumentEvent::Deleted { id, .. } => id,
        }
    }
}
