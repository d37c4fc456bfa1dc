//! Feed startup helper.
//!
//! [`start_feed`] builds everything the router needs from a
//! [`HeatfeedConfig`]: the broadcast channel, the feed task and the
//! rendered map page. The binary and the integration tests both go through
//! it, so they run the exact same wiring.
//!
//! # Usage
//!
//! ```rust,ignore
//! use heatfeed_server::config::HeatfeedConfig;
//! use heatfeed_server::startup::start_feed;
//!
//! let config = HeatfeedConfig::default();
//! let running = start_feed(&config)?;
//! heatfeed_server::start_server(&config.server, running.state, shutdown).await?;
//! running.feed_task.abort();
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::HeatfeedConfig;
use crate::feed::spawn_feed;
use crate::page::render_map_page;
use crate::state::AppState;

/// Errors that can occur while starting the feed.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The map page could not be rendered.
    #[error("map page render error: {0}")]
    Page(#[from] serde_json::Error),
}

/// A running feed task plus the state that reaches it.
#[derive(Debug)]
pub struct RunningFeed {
    /// Shared application state for the router.
    pub state: Arc<AppState>,
    /// The feed task. It ends once every handle to it is dropped.
    pub feed_task: JoinHandle<()>,
}

/// Spawn the feed task and assemble the application state.
///
/// Must be called from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`StartupError::Page`] if the map page cannot be rendered.
pub fn start_feed(config: &HeatfeedConfig) -> Result<RunningFeed, StartupError> {
    let page = render_map_page(config)?;
    let (tx, _) = broadcast::channel(config.feed.broadcast_capacity);
    let (feed, feed_task) = spawn_feed(config, tx.clone());

    tracing::info!(
        poi = config.point_of_interest.name,
        tick_interval_ms = config.feed.tick_interval_ms,
        gathering_active = config.feed.gathering_active,
        "Feed task spawned"
    );

    Ok(RunningFeed {
        state: Arc::new(AppState::new(tx, feed, page)),
        feed_task,
    })
}
