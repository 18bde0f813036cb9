// src/bin/api_server.rs

use recipe_catalog::infra::telemetry;
use recipe_catalog::transport;
use recipe_catalog::{CatalogRuntime, Config};
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// How long shutdown waits for queued counter events.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init();

    info!("Loading configuration...");
    let config = Config::from_env()?;

    info!("Initializing catalog runtime...");
    let mut runtime = CatalogRuntime::from_config(&config).await?;
    let router_handle = runtime
        .spawn_router()
        .ok_or("event router already started")?;
    info!("Event router started.");

    let scheduler_handle = if config.publish_scheduler_enabled {
        info!("Daily publish scheduler started (00:00 UTC).");
        Some(runtime.scheduler.clone().start())
    } else {
        warn!("PUBLISH_SCHEDULER_ENABLED=false, publish sweeps will not run");
        None
    };

    let app_state = transport::http::AppState {
        catalog: runtime.catalog.clone(),
        verifier: runtime.verifier.clone(),
    };

    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);

    let address = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("API server listening on http://{address}");
    info!("Swagger UI available at http://localhost:{}/swagger-ui", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining background work...");
    runtime.scheduler.shutdown();
    if let Some(handle) = scheduler_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "publish scheduler task failed");
        }
    }

    // The router stops once every change feed sender is gone.
    drop(runtime);
    match tokio::time::timeout(DRAIN_TIMEOUT, router_handle).await {
        Ok(Ok(())) => info!("Change feed drained."),
        Ok(Err(e)) => error!(error = %e, "event router task failed"),
        Err(_) => warn!("timed out draining change feed, some counter events may be lost"),
    }

    info!("Graceful shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
