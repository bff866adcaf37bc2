mod config;
mod db;
mod errors;
mod generation;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, run_migrations};
use crate::generation::{Generator, LlmGenerator};
use crate::jobs::bounded::BoundedRunner;
use crate::jobs::dispatch::{DispatchMode, Dispatcher};
use crate::jobs::engine::{ExecutionEngine, ProviderErrorPolicy};
use crate::jobs::queue::RedisJobQueue;
use crate::jobs::store::{JobStore, PgJobStore};
use crate::jobs::worker::QueueWorker;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumeForge API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Execution engine
    let generator: Arc<dyn Generator> = Arc::new(LlmGenerator::new(llm));
    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db.clone()));
    let policy = if config.strict_provider_errors {
        ProviderErrorPolicy::Fail
    } else {
        ProviderErrorPolicy::Embed
    };
    let engine = Arc::new(
        ExecutionEngine::new(Arc::clone(&jobs), generator).with_provider_error_policy(policy),
    );
    info!("Execution engine ready (provider errors: {:?})", policy);

    // Initialize Redis job queue
    let queue = RedisJobQueue::new(&config.redis_url, config.queue_key.clone())?;
    match queue.recover_in_flight().await {
        Ok(0) => {}
        Ok(n) => info!("Re-queued {n} in-flight jobs from a previous run"),
        Err(e) => warn!("Could not recover in-flight jobs: {e}"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers: Vec<_> = (0..config.queue_workers)
        .map(|id| {
            let worker =
                QueueWorker::new(id, Arc::clone(&engine), queue.clone(), shutdown_rx.clone());
            tokio::spawn(worker.run())
        })
        .collect();
    info!("Spawned {} queue workers", workers.len());

    if config.dispatch_mode == DispatchMode::Queued && workers.is_empty() {
        warn!("DISPATCH_MODE=queued with QUEUE_WORKERS=0: jobs will wait for an external worker");
    }

    let runner = BoundedRunner::new(Arc::clone(&engine), config.analysis_timeout);
    info!(
        "Dispatch mode: {:?}, inline budget: {}s",
        config.dispatch_mode,
        runner.budget().as_secs()
    );
    let dispatcher = Dispatcher::new(
        Arc::clone(&jobs),
        runner,
        Arc::new(queue),
        config.dispatch_mode,
    );

    // Build app state
    let state = AppState {
        db,
        jobs,
        dispatcher: Arc::new(dispatcher),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the frontend host once it has a fixed domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped; draining queue workers");
    let _ = shutdown_tx.send(true);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!("Queue worker ended abnormally: {e}");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
