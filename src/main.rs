mod api;
mod broadcast;
mod config;
mod detector;
mod error;
mod live_source;
mod notify;
mod resolver;
mod scheduler;
mod store;
mod tracker;
mod types;
#[cfg(test)]
mod testing;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::routes::{router, ApiState};
use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::error::Result;
use crate::live_source::HttpLiveSource;
use crate::notify::WebhookPresenter;
use crate::scheduler::Scheduler;
use crate::store::{MemoryStore, SqliteStore};
use crate::tracker::{Backends, Tracker};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Stores ---
    let durable = Arc::new(SqliteStore::connect(&cfg.db_path).await?);
    info!("Database ready at {}", cfg.db_path);
    let volatile = MemoryStore::new();

    // --- Notifier ---
    if cfg.webhook_url.is_none() {
        warn!("WEBHOOK_URL not set, notifications will only be logged");
    }
    let presenter = Arc::new(WebhookPresenter::new(cfg.webhook_url.clone())?);
    let (notifier_handle, notifier) = notify::channel(presenter, cfg.dwell());
    tokio::spawn(notifier.run());

    // --- Tracker ---
    let source = Arc::new(HttpLiveSource::new(&cfg)?);
    let tracker = Tracker::new(
        Backends { durable, volatile, source, notifier: notifier_handle },
        Broadcaster::new(),
        Arc::new(HealthState::new()),
        Arc::new(LatencyStats::new()),
    );

    // --- Scheduler ---
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = Scheduler::new(Arc::clone(&tracker), cfg.poll_interval());
    let scheduler_task = tokio::spawn(scheduler.run(shutdown_rx));
    info!(
        "Polling {} every {}s when matches are tracked (dwell {}s)",
        cfg.live_source_url, cfg.poll_interval_secs, cfg.dwell_secs,
    );

    // --- HTTP API server ---
    let app = router(ApiState::new(tracker));
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = scheduler_task.await {
        warn!("Scheduler task ended abnormally: {e}");
    }
    Ok(())
}
