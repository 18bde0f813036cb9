pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::catalog_service::{CatalogError, CatalogService, RecipePage};
pub use app::counter_service::{CounterPolicy, CounterService};
pub use app::event_router::EventRouter;
pub use app::publish_scheduler::{PublishReport, PublishScheduler, SchedulerConfig};
pub use app::runtime::CatalogRuntime;
pub use infra::config::Config;
