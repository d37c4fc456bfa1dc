//! Shared application state for the feed server.
//!
//! [`AppState`] holds the broadcast channel for tick updates, the handle
//! into the feed task and the pre-rendered map page.

use heatfeed_types::ServerMessage;
use tokio::sync::broadcast;

use crate::feed::FeedHandle;

/// Shared state for the Axum application.
///
/// Wrapped in [`std::sync::Arc`] and injected via Axum's `State`
/// extractor. Each `WebSocket` connection holds one broadcast receiver
/// for as long as it is open, so the receiver count is the number of
/// connected viewers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Broadcast sender for `heatmap_update` messages.
    pub tx: broadcast::Sender<ServerMessage>,
    /// Handle into the feed task.
    pub feed: FeedHandle,
    /// Rendered map page served at `GET /`.
    pub page: String,
}

impl AppState {
    /// Create the application state.
    pub fn new(tx: broadcast::Sender<ServerMessage>, feed: FeedHandle, page: String) -> Self {
        Self { tx, feed, page }
    }

    /// Subscribe to tick updates.
    ///
    /// Holding the returned receiver is what makes a connection count as a
    /// viewer for the tick loop.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    /// Number of connected viewers.
    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
