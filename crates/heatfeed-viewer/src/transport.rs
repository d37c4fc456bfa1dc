//! `WebSocket` transport driver.
//!
//! Turns socket events into [`LiveOverlaySync`] transitions and carries out
//! the actions it returns. One connection exists at a time; the reconnect
//! timer is a plain [`tokio::time::sleep`].

use futures::{SinkExt, StreamExt};
use heatfeed_types::ClientMessage;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::overlay::OverlaySurface;
use crate::sync::{LiveOverlaySync, SyncAction};

type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Check that `url` is a usable `ws://` or `wss://` endpoint.
///
/// # Errors
///
/// Returns [`ViewerError::TransportUnavailable`] otherwise.
pub fn validate_url(url: &str) -> Result<(), ViewerError> {
    let request = url
        .into_client_request()
        .map_err(|e| ViewerError::TransportUnavailable(format!("{url}: {e}")))?;

    match request.uri().scheme_str() {
        Some("ws" | "wss") => Ok(()),
        other => Err(ViewerError::TransportUnavailable(format!(
            "{url}: unsupported scheme {}",
            other.unwrap_or("(none)")
        ))),
    }
}

/// Drive `sync` against the feed at `config.url`.
///
/// Renders the fallback set, connects, and keeps reconnecting until the
/// sync's reconnect switch is disabled while it is closed. Runs forever
/// otherwise; callers stop it by dropping the future.
///
/// # Errors
///
/// Only initialization errors escape: [`ViewerError::TransportUnavailable`]
/// for a bad URL and whatever the surface's `mount` returns.
pub async fn run<S: OverlaySurface>(
    config: &ViewerConfig,
    sync: &mut LiveOverlaySync<S>,
) -> Result<(), ViewerError> {
    validate_url(&config.url)?;
    let mut action = sync.start()?;

    loop {
        action = match action {
            SyncAction::Connect => run_connection(&config.url, sync).await,
            SyncAction::ScheduleReconnect(delay) => {
                tokio::time::sleep(delay).await;
                sync.on_retry_due()
            }
            SyncAction::Send(message) => {
                warn!(?message, "no open connection to send on");
                SyncAction::Idle
            }
            SyncAction::Idle => {
                info!("viewer stopped");
                return Ok(());
            }
        };
    }
}

/// One connection, from handshake to terminal transition.
async fn run_connection<S: OverlaySurface>(
    url: &str,
    sync: &mut LiveOverlaySync<S>,
) -> SyncAction {
    debug!(url, "connecting to feed");
    let mut socket = match connect_async(url).await {
        Ok((socket, _)) => socket,
        Err(e) => return sync.on_error(&ViewerError::ConnectionError(e.to_string())),
    };

    if let SyncAction::Send(message) = sync.on_open() {
        if let Err(e) = send(&mut socket, &message).await {
            return sync.on_error(&e);
        }
    }

    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let _ = sync.on_message(text.as_str());
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "feed sent close");
                return sync.on_close();
            }
            Ok(Message::Binary(bytes)) => {
                debug!(len = bytes.len(), "ignoring binary frame");
            }
            Ok(_) => {}
            Err(e) => return sync.on_error(&ViewerError::ConnectionError(e.to_string())),
        }
    }

    sync.on_close()
}

async fn send(socket: &mut FeedSocket, message: &ClientMessage) -> Result<(), ViewerError> {
    let text = serde_json::to_string(message)
        .map_err(|e| ViewerError::ConnectionError(format!("encode failed: {e}")))?;
    socket
        .send(Message::text(text))
        .await
        .map_err(|e| ViewerError::ConnectionError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_websocket_urls() {
        assert_eq!(validate_url("ws://localhost:8080/heatmap-updates"), Ok(()));
        assert_eq!(validate_url("wss://feed.example.org/live"), Ok(()));
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            validate_url("http://localhost:8080/heatmap-updates"),
            Err(ViewerError::TransportUnavailable(_))
        ));
        assert!(matches!(
            validate_url("not a url"),
            Err(ViewerError::TransportUnavailable(_))
        ));
    }
}
