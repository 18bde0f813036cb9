use chrono::Utc;
use recipe_catalog::infra::telemetry;
use recipe_catalog::{CatalogRuntime, Config};

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight -- [--reconcile-counters] [--publish-now]\n\
         \n\
         Reads the same env vars as api_server:\n\
           STORE_BACKEND, DATABASE_URL, IDENTITY_VERIFY_URL | STATIC_API_TOKENS, OBJECT_STORE_URL\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }
    let reconcile = args.iter().any(|a| a == "--reconcile-counters");
    let publish_now = args.iter().any(|a| a == "--publish-now");

    let config = Config::from_env()?;

    println!("> Preflight:");
    println!("  STORE_BACKEND={:?}", config.store_backend);
    println!(
        "  identity: {}",
        match (&config.identity_verify_url, config.static_api_tokens.len()) {
            (Some(url), _) => format!("remote ({})", url),
            (None, 0) => "NONE (all writes will be rejected)".to_string(),
            (None, n) => format!("{} static token(s)", n),
        }
    );
    println!(
        "  OBJECT_STORE_URL={}",
        config.object_store_url.as_deref().unwrap_or("(unset, image cleanup disabled)")
    );

    let mut runtime = CatalogRuntime::from_config(&config).await?;
    runtime.catalog.ping().await?;
    println!("  Store reachable.");

    let counters = runtime.catalog.counters().await?;
    let unpublished = runtime.catalog.unpublished().await?;
    let now = Utc::now();
    let due = unpublished.iter().filter(|d| d.recipe.is_due(now)).count();
    println!("  Counters: all={} published={}", counters.all, counters.published);
    println!("  Unpublished recipes: {} ({} due)", unpublished.len(), due);

    if publish_now {
        let report = runtime.scheduler.run_once(now).await;
        println!(
            "  Publish sweep: published={} skipped={} failed={} deferred={}",
            report.published, report.skipped, report.failed, report.deferred
        );

        // Every sweep update is already queued; route them inline.
        if let Some(mut feed) = runtime.feed.take() {
            while let Ok(event) = feed.try_recv() {
                runtime.router.route(event).await;
            }
        }
        let after = runtime.catalog.counters().await?;
        println!("  Counters after sweep: all={} published={}", after.all, after.published);
    }

    if reconcile {
        let before = runtime.catalog.counters().await?;
        let after = runtime.catalog.reconcile_counters().await?;
        println!(
            "  Reconciled counters: all={} published={} (was all={} published={})",
            after.all, after.published, before.all, before.published
        );
    } else {
        let actual = runtime.catalog.actual_counts().await?;
        let recorded = runtime.catalog.counters().await?;
        if actual != recorded {
            eprintln!(
                "  Warning: counters drifted (recorded all={} published={}, store has all={} published={}); \
re-run with --reconcile-counters",
                recorded.all, recorded.published, actual.all, actual.published
            );
        }
    }

    println!("> Preflight OK.");
    Ok(())
}
