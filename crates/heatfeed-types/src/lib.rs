//! Shared wire types for the heatfeed live heat-map feed.
//!
//! This crate is the single source of truth for everything the feed server
//! and its viewers exchange over the `WebSocket`. Types defined here flow
//! downstream to `TypeScript` via `ts-rs` for the embedded map page.
//!
//! # Modules
//!
//! - [`point`] -- [`WeightedPoint`], the `[lat, lng, intensity]` triple
//! - [`messages`] -- tagged messages in both directions
//! - [`places`] -- the fixed background point set around the feed region

pub mod messages;
pub mod places;
pub mod point;

// Re-export all public types at crate root for convenience.
pub use messages::{ClientMessage, ServerMessage};
pub use places::{BACKGROUND_POINTS, DEFAULT_REGION, SOMNATH, background_points};
pub use point::{GeoPoint, WeightedPoint, clamp_unit};
