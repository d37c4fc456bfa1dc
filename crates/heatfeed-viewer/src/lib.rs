//! Live overlay sync for the heatfeed map.
//!
//! The viewer keeps one heat overlay in step with a feed server over a
//! `WebSocket`. It shows a fixed fallback set while disconnected, replaces
//! the overlay wholesale on every recognized message and reconnects on a
//! fixed delay.
//!
//! # Layout
//!
//! - [`sync`]: the connection state machine, one handler per transition
//! - [`transport`]: drives the state machine with `tokio-tungstenite`
//! - [`parse`]: recognizes the accepted payload shapes
//! - [`overlay`]: the rendering surface seam and an in-memory heat layer
//! - [`config`]: environment configuration

pub mod config;
pub mod error;
pub mod overlay;
pub mod parse;
pub mod sync;
pub mod transport;

pub use config::ViewerConfig;
pub use error::ViewerError;
pub use overlay::{HeatLayer, OverlaySurface};
pub use sync::{ConnectionState, LiveOverlaySync, ReconnectPolicy, ReconnectSwitch, SyncAction};
pub use transport::run;
