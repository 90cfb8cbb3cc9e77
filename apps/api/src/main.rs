use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lifescore::analysis::{gemini, GeminiAnalyzer};
use lifescore::config::Config;
use lifescore::db::create_pool;
use lifescore::jobs::{resume_pending, AnalysisWorker, WorkerConfig};
use lifescore::routes::build_router;
use lifescore::state::AppState;
use lifescore::store::PgReportStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "lifescore={level},lifescore_api={level},tower_http={level}",
                level = &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting LifeScore API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgReportStore::new(db));

    let analyzer = GeminiAnalyzer::new(
        config.google_api_key.clone(),
        Duration::from_secs(config.analysis_timeout_secs),
    )?;
    if analyzer.has_api_key() {
        info!("Analyzer initialized (model: {})", gemini::MODEL);
    } else {
        warn!("GOOGLE_API_KEY is not set; every report will receive the fallback analysis");
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    let worker = AnalysisWorker::new(
        store.clone(),
        Arc::new(analyzer),
        WorkerConfig::from_config(&config),
    );
    let (queue, worker_handle) = worker.start();

    if let Err(e) = resume_pending(store.as_ref(), &queue).await {
        warn!("Failed to resume pending analyses: {e:#}");
    }

    let state = AppState {
        store,
        queue,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, finishing queued analyses");
    worker_handle.drain().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
