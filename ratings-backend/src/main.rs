use ratings_backend::config::BackendConfig;
use ratings_backend::module::imdb::{CacheStore, HttpDatasetFetcher, LookupEngine, RatingsUpdater};
use ratings_backend::module::scheduled::{ScheduledTaskConfig, ScheduledTaskManager};
use ratings_backend::service::{self, AppState};

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let (config, defaulted) = BackendConfig::load_or_default(&config_path)?;

    // Initialize logging
    let _logging_guard = ratings_common::logging::init_logging(
        &config.log_dir,
        "ratings-backend",
        &config.log_level,
    )?;

    if defaulted {
        tracing::warn!("Config file '{}' not found, using defaults", config_path);
    }

    tracing::info!("Ratings Backend starting...");
    tracing::info!("Server will listen on {}", config.server_address());

    let fetcher = HttpDatasetFetcher::new(
        config.data_dir(),
        Duration::from_secs(config.http_timeout_secs),
        Duration::from_secs(config.connect_timeout_secs),
    )
    .context("Failed to build HTTP client")?;

    let store = Arc::new(CacheStore::new());
    let updater = Arc::new(RatingsUpdater::new(
        Arc::new(fetcher),
        store.clone(),
        config.ratings_dataset(),
        config.episodes_dataset(),
    ));

    // Configure and start scheduled tasks
    let task_config = ScheduledTaskConfig {
        refresh_hour: config.refresh_hour,
        refresh_minute: config.refresh_minute,
        refresh_on_startup: config.refresh_on_startup,
    };

    let mut task_manager = ScheduledTaskManager::new(task_config, updater.clone());
    task_manager.start_all();

    let app = service::router(AppState::new(LookupEngine::new(store), updater));

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.server_address()))?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);
    tracing::info!("Try: http://{}/api/rating/tt0111161", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    task_manager.shutdown().await;
    tracing::info!("Ratings Backend stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
