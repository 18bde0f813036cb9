//! Catalog event router.
//!
//! Drains the change feed and turns each [`DocumentEvent`] into counter deltas
//! and, for deletions, an image cleanup request. Every side effect is attempted
//! once; failures are logged and absorbed since the write that caused them has
//! already succeeded.

use crate::app::counter_service::CounterService;
use crate::domain::{CounterKey, DocumentEvent};
use crate::infra::object_store::{object_path_from_url, ObjectStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};

pub type EventSender = mpsc::UnboundedSender<DocumentEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<DocumentEvent>;

/// Creates the change feed connecting the catalog to the router.
pub fn change_feed() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Side effects derived from one event, before they are dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventEffects {
    pub deltas: Vec<(CounterKey, i64)>,
    pub image_url: Option<String>,
}

/// Pure derivation of the counter deltas and asset cleanup for `event`.
pub fn effects_of(event: &DocumentEvent) -> EventEffects {
    let mut effects = EventEffects::default();
    match event {
        DocumentEvent::Created { after, .. } => {
            effects.deltas.push((CounterKey::All, 1));
            if after.is_published {
                effects.deltas.push((CounterKey::Published, 1));
            }
        }
        DocumentEvent::Deleted { before, .. } => {
            effects.deltas.push((CounterKey::All, -1));
            if before.is_published {
                effects.deltas.push((CounterKey::Published, -1));
            }
            effects.image_url = before.image_url.clone();
        }
        DocumentEvent::Updated { before, after, .. } => {
            let delta = i64::from(after.is_published) - i64::from(before.is_published);
            if delta != 0 {
                effects.deltas.push((CounterKey::Published, delta));
            }
        }
    }
    effects
}

#[derive(Clone)]
pub struct EventRouter {
    counters: Arc<CounterService>,
    objects: Arc<dyn ObjectStore>,
}

impl EventRouter {
    pub fn new(counters: Arc<CounterService>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { counters, objects }
    }

    /// Handles one event to completion.
    pub async fn route(&self, event: DocumentEvent) {
        let id = event.id().clone();
        let effects = effects_of(&event);

        let counters = async {
            for (key, delta) in &effects.deltas {
                if let Err(e) = self.counters.apply_delta(*key, *delta).await {
                    error!(recipe_id = %id, kind = ?event.kind(), error = %e, "counter event dropped");
                }
            }
        };
        // Cleanup runs alongside the counters and cannot hold them up.
        let cleanup = async {
            if let Some(url) = &effects.image_url {
                self.delete_image(id.as_str(), url).await;
            }
        };
        tokio::join!(counters, cleanup);
    }

    async fn delete_image(&self, recipe_id: &str, url: &str) {
        let Some(path) = object_path_from_url(url) else {
            warn!(recipe_id, url, "image url has no object path, skipping cleanup");
            return;
        };
        info!(recipe_id, path = %path, "attempting to delete image");
        match self.objects.delete(&path).await {
            Ok(()) => info!(recipe_id, path = %path, "image deleted"),
            Err(e) => warn!(recipe_id, path = %path, error = %e, "failed to delete image"),
        }
    }

    /// Runs until every sender is dropped, processing events concurrently.
    ///
    /// In-flight events are drained before the task finishes.
    pub fn spawn(self, mut feed: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    maybe_event = feed.recv() => {
                        let Some(event) = maybe_event else { break };
                        let router = self.clone();
                        in_flight.spawn(async move { router.route(event).await });
                    }
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                        if let Err(e) = joined {
                            error!(error = %e, "event task panicked");
                        }
                    }
                }
            }
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    error!(error = %e, "event task panicked");
                }
            }
            info!("change feed closed, event router stopped");
        })
    }
}
