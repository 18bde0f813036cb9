//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use recipe_catalog::domain::{Category, CounterSnapshot, Recipe};
use recipe_catalog::infra::identity::StaticTokenVerifier;
use recipe_catalog::infra::object_store::ObjectStore;
use recipe_catalog::storage::{MemoryCounterBackend, MemoryRecipeStore};
use recipe_catalog::{CatalogRuntime, CatalogService, CounterPolicy, SchedulerConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TOKEN: &str = "test-token";
pub const UID: &str = "chef-1";

pub fn recipe(name: &str, is_published: bool) -> Recipe {
    Recipe {
        name: name.to_string(),
        category: Category::EggsAndBreakfast,
        directions: "Whisk and cook.".to_string(),
        ingredients: vec!["eggs".to_string(), "salt".to_string()],
        publish_date: Utc::now() - ChronoDuration::days(1),
        is_published,
        image_url: None,
    }
}

pub fn image_url(path: &str) -> String {
    format!(
        "https://storage.example.com/v0/b/recipes.appspot.com/o/{}?alt=media&token=abc",
        urlencoding::encode(path)
    )
}

/// Object store double: records every deletion request, optionally failing each one.
#[derive(Debug, Default)]
pub struct RecordingObjectStore {
    requests: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the request, then reports failure.
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Paths requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log poisoned").clone()
    }
}

#[async_trait]
impl ObjectStore for RecordingObjectStore {
    async fn delete(&self, path: &str) -> anyhow::Result<()> {
        self.requests
            .lock()
            .expect("request log poisoned")
            .push(path.to_string());
        if self.fail {
            anyhow::bail!("object '{}' could not be deleted", path);
        }
        Ok(())
    }
}

pub struct Harness {
    pub runtime: CatalogRuntime,
    pub store: Arc<MemoryRecipeStore>,
    pub counters: Arc<MemoryCounterBackend>,
    pub objects: Arc<RecordingObjectStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_objects(RecordingObjectStore::new())
    }

    pub fn with_objects(objects: RecordingObjectStore) -> Self {
        Self::build(objects, SchedulerConfig::default())
    }

    pub fn build(objects: RecordingObjectStore, scheduler: SchedulerConfig) -> Self {
        let store = Arc::new(MemoryRecipeStore::new());
        let counters = Arc::new(MemoryCounterBackend::new());
        let objects = Arc::new(objects);
        let mut runtime = CatalogRuntime::assemble(
            store.clone(),
            counters.clone(),
            objects.clone(),
            Arc::new(StaticTokenVerifier::new([(TOKEN.to_string(), UID.to_string())])),
            CounterPolicy {
                max_attempts: 3,
                retry_backoff: Duration::from_millis(1),
            },
            scheduler,
        );
        runtime.spawn_router();
        Self {
            runtime,
            store,
            counters,
            objects,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogService> {
        &self.runtime.catalog
    }

    /// Polls until the counters reach `expected`; counter updates land asynchronously.
    pub async fn wait_for_counters(&self, expected: CounterSnapshot) -> CounterSnapshot {
        let mut last = CounterSnapshot::default();
        for _ in 0..200 {
            last = self.catalog().counters().await.expect("counters readable");
            if last == expected {
                return last;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        last
    }
}
