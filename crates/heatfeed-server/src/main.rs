//! Heatfeed server binary.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `heatfeed-config.yaml` (or `HEATFEED_CONFIG`)
//! 3. Spawn the feed task and render the map page
//! 4. Serve HTTP + `WebSocket` until Ctrl-C
//! 5. Stop the feed task

use std::path::PathBuf;

use heatfeed_server::config::{ConfigError, HeatfeedConfig, env_lookup};
use heatfeed_server::server::shutdown_signal;
use heatfeed_server::{start_feed, start_server};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "heatfeed-config.yaml";

/// Application entry point for the feed server.
///
/// # Errors
///
/// Returns an error if configuration, startup or serving fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("heatfeed-server starting");

    let config = load_config()?;
    info!(
        host = config.server.host,
        port = config.server.port,
        ws_path = config.server.ws_path,
        tick_interval_ms = config.feed.tick_interval_ms,
        poi = config.point_of_interest.name,
        "Configuration loaded"
    );

    let running = start_feed(&config)?;
    let result = start_server(&config.server, running.state, shutdown_signal()).await;

    running.feed_task.abort();
    info!("heatfeed-server stopped");

    result.map_err(Into::into)
}

/// Load configuration from `HEATFEED_CONFIG` or the default path.
///
/// A missing default file is not an error: defaults are used instead.
/// A missing file named explicitly through `HEATFEED_CONFIG` is.
fn load_config() -> Result<HeatfeedConfig, ConfigError> {
    if let Ok(path) = std::env::var("HEATFEED_CONFIG") {
        return HeatfeedConfig::from_file(&PathBuf::from(path));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        HeatfeedConfig::from_file(&path)
    } else {
        info!("Config file not found, using defaults");
        HeatfeedConfig::parse_with_overrides("", env_lookup)
    }
}
