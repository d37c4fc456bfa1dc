//! Live heat-map feed server.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/heatmap-updates`) pushing the full point
//!   set on connect and a `heatmap_update` every tick via
//!   [`tokio::sync::broadcast`]
//! - **Map page** (`GET /`) rendering the heat layer with Leaflet
//! - **Status endpoint** (`GET /api/status`) reporting the feed state
//!
//! # Architecture
//!
//! All mutable feed state lives in a [`FeedContext`] owned by one task
//! ([`feed::run_feed`]). Connections reach it through a [`FeedHandle`];
//! ticks and commands are processed one at a time, so the simulated
//! intensity needs no lock even though any viewer may override it.
//!
//! [`FeedContext`]: feed::FeedContext
//! [`FeedHandle`]: feed::FeedHandle

pub mod cluster;
pub mod config;
pub mod error;
pub mod feed;
pub mod handlers;
pub mod page;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use config::HeatfeedConfig;
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use startup::{RunningFeed, start_feed};
pub use state::AppState;
