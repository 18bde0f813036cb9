//! Daily publish sweep.
//!
//! Once a day at 00:00 UTC every unpublished recipe whose publish date has
//! passed is flipped to published through [`CatalogService::publish`], which
//! feeds the same change feed as API writes. Updates are independent: one
//! failure is logged and the sweep carries on. Fan-out is bounded by a
//! semaphore and the whole sweep by a wall-clock budget; recipes not started
//! within the budget are left for the next run.

use crate::app::catalog_service::CatalogService;
use crate::domain::RecipeId;
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Maximum concurrent publish updates.
    pub max_in_flight: usize,
    /// Wall-clock budget for one sweep.
    pub run_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 16,
            run_timeout: Duration::from_secs(300),
        }
    }
}

/// Aggregated result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Unpublished recipes found.
    pub scanned: usize,
    /// Of those, recipes whose publish date had passed.
    pub due: usize,
    pub published: usize,
    /// Due recipes someone else already published or deleted.
    pub skipped: usize,
    pub failed: usize,
    /// Due recipes not started before the budget ran out.
    pub deferred: usize,
}

enum ItemOutcome {
    Published,
    Skipped,
    Failed,
}

pub struct PublishScheduler {
    catalog: Arc<CatalogService>,
    config: SchedulerConfig,
    shutdown: Arc<Notify>,
}

impl PublishScheduler {
    pub fn new(catalog: Arc<CatalogService>, config: SchedulerConfig) -> Self {
        Self {
            catalog,
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Runs one sweep as of `now`.
    pub async fn run_once(&self, now: DateTime<Utc>) -> PublishReport {
        let deadline = Instant::now() + self.config.run_timeout;
        let mut report = PublishReport::default();

        let unpublished = match self.catalog.unpublished().await {
            Ok(docs) => docs,
            Err(e) => {
                error!(error = %e, "publish sweep could not scan unpublished recipes");
                return report;
            }
        };
        report.scanned = unpublished.len();

        let due: Vec<RecipeId> = unpublished
            .into_iter()
            .filter(|doc| doc.recipe.is_due(now))
            .map(|doc| doc.id)
            .collect();
        report.due = due.len();

        let permits = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut workers = JoinSet::new();

        for (index, id) in due.iter().enumerate() {
            // Only wait for a slot while budget remains; started updates are
            // always awaited below.
            let permit = match tokio::time::timeout_at(deadline, permits.clone().acquire_owned()).await {
                Ok(Ok(permit)) if Instant::now() < deadline => permit,
                _ => {
                    report.deferred = due.len() - index;
                    warn!(deferred = report.deferred, "publish sweep budget exhausted");
                    break;
                }
            };

            let catalog = self.catalog.clone();
            let id = id.clone();
            workers.spawn(async move {
                let _permit = permit;
                match catalog.publish(&id).await {
                    Ok(true) => ItemOutcome::Published,
                    Ok(false) => ItemOutcome::Skipped,
                    Err(e) => {
                        error!(recipe_id = %id, error = %e, "failed to publish recipe");
                        ItemOutcome::Failed
                    }
                }
            });
        }

        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(ItemOutcome::Published) => report.published += 1,
                Ok(ItemOutcome::Skipped) => report.skipped += 1,
                Ok(ItemOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "publish task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(?report, "publish sweep finished");
        report
    }

    /// Starts the daily loop. Stops after [`PublishScheduler::shutdown`].
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let wait = duration_until_next_run(Utc::now());
                info!(wait_secs = wait.as_secs(), "next publish sweep scheduled");
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        info!("daily publish sweep triggered");
                        self.run_once(Utc::now()).await;
                    }
                    _ = self.shutdown.notified() => {
                        info!("publish scheduler shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }
}

/// Time from `now` until the next 00:00 UTC (a full day when `now` is exactly midnight).
pub fn duration_until_next_run(now: DateTime<Utc>) -> Duration {
    let next_midnight = (now.date_naive() + ChronoDuration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc();
    (next_midnight - now)
        .to_std()
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}
