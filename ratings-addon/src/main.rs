use ratings_addon::backend::RatingsClient;
use ratings_addon::config::AddonConfig;
use ratings_addon::frontend::stremio::{self, AddonState};

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let (config, defaulted) = AddonConfig::load_or_default(&config_path)?;

    let _logging_guard = ratings_common::logging::init_logging(
        &config.log_dir,
        "ratings-addon",
        &config.log_level,
    )?;

    if defaulted {
        tracing::warn!("Config file '{}' not found, using defaults", config_path);
    }

    tracing::info!("Ratings Add-on starting...");

    let client = RatingsClient::new(
        &config.ratings_api_url,
        Duration::from_secs(config.request_timeout_secs),
    )
    .context("Failed to create ratings backend client")?;

    let app = stremio::router(AddonState::new(Arc::new(client)), config.enable_cors);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Add-on listening on http://{}", addr);
    tracing::info!("Manifest: http://localhost:{}/manifest.json", config.port);
    tracing::info!("Will connect to ratings API at: {}", config.ratings_api_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received.");
            }
        })
        .await?;

    Ok(())
}
