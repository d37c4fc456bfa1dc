//! `WebSocket` handler for the live heat-map feed.
//!
//! Viewers connect to the configured path (default `/heatmap-updates`).
//! Each connection:
//!
//! 1. subscribes to the tick broadcast, which registers it as a viewer
//! 2. receives the current point set as a `full_update`
//! 3. receives every subsequent `heatmap_update`
//! 4. may send `request_data`, `set_crowd_intensity` or
//!    `toggle_gathering` at any time
//!
//! Malformed viewer messages are logged and ignored. When a send fails the
//! connection is considered gone and the handler returns, dropping its
//! receiver so later ticks skip it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use heatfeed_types::{ClientMessage, ServerMessage};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming heat-map updates.
///
/// # Route
///
/// `GET /heatmap-updates` (configurable)
pub async fn ws_heatmap(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// The connection went away while sending.
#[derive(Debug)]
struct Disconnected;

/// Serialize and send one message.
///
/// Serialization failures are logged and skipped; only transport failures
/// end the connection.
async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), Disconnected> {
    let json = match serde_json::to_string(msg) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize feed message: {e}");
            return Ok(());
        }
    };
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| Disconnected)
}

/// Handle the `WebSocket` lifecycle.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = Uuid::now_v7();

    // Subscribe before the snapshot so no tick falls between the two.
    let mut rx = state.subscribe();
    info!(%conn_id, viewers = state.viewer_count(), "viewer connected");

    match state
        .feed
        .snapshot(Some(String::from("Connected to live heatmap feed")))
        .await
    {
        Ok(full) => {
            if send_message(&mut socket, &full).await.is_err() {
                debug!(%conn_id, "viewer disconnected before initial data");
                return;
            }
        }
        Err(e) => {
            warn!(%conn_id, error = %e, "no initial data for viewer");
            return;
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(update) => {
                        if send_message(&mut socket, &update).await.is_err() {
                            debug!(%conn_id, "viewer disconnected (send failed)");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(%conn_id, skipped = n, "viewer lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!(%conn_id, "broadcast channel closed, shutting down WebSocket");
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if handle_viewer_text(&mut socket, &state, text.as_str(), conn_id)
                            .await
                            .is_err()
                        {
                            debug!(%conn_id, "viewer disconnected (reply failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%conn_id, "viewer disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(%conn_id, "WebSocket error: {e}");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary and pong frames carry nothing for the feed.
                    }
                }
            }
        }
    }

    drop(rx);
    info!(%conn_id, viewers = state.viewer_count(), "viewer disconnected");
}

/// Apply one text frame from a viewer.
async fn handle_viewer_text(
    socket: &mut WebSocket,
    state: &AppState,
    text: &str,
    conn_id: Uuid,
) -> Result<(), Disconnected> {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(%conn_id, error = %e, "ignoring malformed viewer message");
            return Ok(());
        }
    };
    debug!(%conn_id, ?message, "viewer message");

    match state.feed.apply(message).await {
        Ok(Some(reply)) => send_message(socket, &reply).await,
        Ok(None) => Ok(()),
        Err(e) => {
            warn!(%conn_id, error = %e, "feed rejected viewer message");
            Ok(())
        }
    }
}
