//! Headless heatfeed viewer.
//!
//! Connects to a feed server, keeps an in-memory heat layer in sync and
//! logs every overlay replacement. Stops on Ctrl-C.

use heatfeed_viewer::{HeatLayer, LiveOverlaySync, ReconnectSwitch, ViewerConfig, run};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application entry point for the viewer.
///
/// # Errors
///
/// Returns an error if configuration is invalid or initialization fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ViewerConfig::from_env()?;
    info!(
        url = config.url,
        region = config.region,
        reconnect_ms = config.reconnect_delay.as_millis(),
        "heatfeed-viewer starting"
    );

    let switch = ReconnectSwitch::new();
    let mut sync = LiveOverlaySync::from_config(HeatLayer::new(), &config, switch.clone());

    tokio::select! {
        result = run(&config, &mut sync) => result?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!(error = %e, "failed to listen for Ctrl-C");
            }
            switch.disable();
            info!("shutdown signal received");
        }
    }

    let layer = sync.into_surface();
    info!(
        replacements = layer.replacements(),
        points = layer.points().len(),
        "heatfeed-viewer stopped"
    );
    Ok(())
}
