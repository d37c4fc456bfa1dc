//! Error types for the viewer.
//!
//! None of these ever escape [`LiveOverlaySync`](crate::sync::LiveOverlaySync):
//! initialization errors abort startup with a logged diagnostic, message
//! errors drop the message, and connection errors fall back to static data
//! followed by a timed reconnect.

/// Errors that can occur in the viewer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewerError {
    /// The push transport cannot be used (unsupported or unparseable URL).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// The rendering surface has nowhere to draw.
    #[error("render container missing: {0}")]
    ContainerMissing(String),

    /// A message could not be parsed or had an unrecognized shape.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// The transport reported an error.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}
