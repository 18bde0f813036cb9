//! Wires stores, collaborators and services together from a [`Config`].

use crate::app::catalog_service::CatalogService;
use crate::app::counter_service::{CounterPolicy, CounterService};
use crate::app::event_router::{change_feed, EventReceiver, EventRouter};
use crate::app::publish_scheduler::{PublishScheduler, SchedulerConfig};
use crate::infra::config::{Config, StoreBackend};
use crate::infra::identity::{DenyAllVerifier, RemoteTokenVerifier, StaticTokenVerifier, TokenVerifier};
use crate::infra::object_store::{HttpObjectStore, ObjectStore, UnconfiguredObjectStore};
use crate::storage::{
    postgres, CounterBackend, MemoryCounterBackend, MemoryRecipeStore, PostgresCounterBackend,
    PostgresRecipeStore, RecipeStore,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a process needs to serve the catalog.
///
/// The change feed receiver is handed out once, to whoever runs the router.
pub struct CatalogRuntime {
    pub catalog: Arc<CatalogService>,
    pub counters: Arc<CounterService>,
    pub router: EventRouter,
    pub feed: Option<EventReceiver>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub scheduler: Arc<PublishScheduler>,
}

impl CatalogRuntime {
    pub fn assemble(
        recipes: Arc<dyn RecipeStore>,
        counter_backend: Arc<dyn CounterBackend>,
        objects: Arc<dyn ObjectStore>,
        verifier: Arc<dyn TokenVerifier>,
        policy: CounterPolicy,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let counters = Arc::new(CounterService::new(counter_backend, policy));
        let (events, feed) = change_feed();
        let catalog = Arc::new(CatalogService::new(recipes, counters.clone(), events));
        let router = EventRouter::new(counters.clone(), objects);
        let scheduler = Arc::new(PublishScheduler::new(catalog.clone(), scheduler_config));
        Self {
            catalog,
            counters,
            router,
            feed: Some(feed),
            verifier,
            scheduler,
        }
    }

    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let (recipes, counter_backend): (Arc<dyn RecipeStore>, Arc<dyn CounterBackend>) =
            match config.store_backend {
                StoreBackend::Postgres => {
                    let pool =
                        postgres::connect(config.require_database_url()?, config.db_max_connections)
                            .await?;
                    info!("connected to PostgreSQL");
                    (
                        Arc::new(PostgresRecipeStore::new(pool.clone())),
                        Arc::new(PostgresCounterBackend::new(pool)),
                    )
                }
                StoreBackend::Memory => {
                    warn!("using in-memory stores, data is lost on restart");
                    (
                        Arc::new(MemoryRecipeStore::new()),
                        Arc::new(MemoryCounterBackend::new()),
                    )
                }
            };

        let objects: Arc<dyn ObjectStore> = match &config.object_store_url {
            Some(url) => Arc::new(HttpObjectStore::new(url.clone())?),
            None => {
                warn!("OBJECT_STORE_URL not set, image cleanup will fail");
                Arc::new(UnconfiguredObjectStore)
            }
        };

        Ok(Self::assemble(
            recipes,
            counter_backend,
            objects,
            verifier_from_config(config)?,
            CounterPolicy {
                max_attempts: config.counter_max_attempts,
                retry_backoff: config.counter_retry_backoff,
            },
            SchedulerConfig {
                max_in_flight: config.publish_max_in_flight,
                run_timeout: config.publish_run_timeout,
            },
        ))
    }

    /// Starts the event router on the change feed. Only the first call spawns.
    pub fn spawn_router(&mut self) -> Option<tokio::task::JoinHandle<()>> {
        let feed = self.feed.take()?;
        Some(self.router.clone().spawn(feed))
    }
}

fn verifier_from_config(config: &Config) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    if let Some(url) = &config.identity_verify_url {
        return Ok(Arc::new(RemoteTokenVerifier::new(url.clone())?));
    }
    if !config.static_api_tokens.is_empty() {
        info!(tokens = config.static_api_tokens.len(), "using static API tokens");
        return Ok(Arc::new(StaticTokenVerifier::new(
            config.static_api_tokens.iter().cloned(),
        )));
    }
    warn!("no identity provider configured, all writes will be rejected");
    Ok(Arc::new(DenyAllVerifier))
}
