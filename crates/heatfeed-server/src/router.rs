//! Axum router construction for the feed server.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so maps hosted elsewhere can read the
//! status endpoint.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Map page route.
pub const INDEX_ROUTE: &str = "/";

/// Feed status route.
pub const STATUS_ROUTE: &str = "/api/status";

/// Liveness route.
pub const HEALTH_ROUTE: &str = "/health";

/// Fixed routes the `WebSocket` path must not shadow.
pub const RESERVED_ROUTES: [&str; 3] = [INDEX_ROUTE, STATUS_ROUTE, HEALTH_ROUTE];

/// Build the complete Axum router for the feed server.
///
/// The router includes:
/// - `GET /` -- map page
/// - `GET {ws_path}` -- heat-map `WebSocket` (default `/heatmap-updates`)
/// - `GET /api/status` -- feed status
/// - `GET /health` -- liveness probe
///
/// `ws_path` must be a validated path (see
/// [`HeatfeedConfig::validate`](crate::config::HeatfeedConfig::validate)).
pub fn build_router(state: Arc<AppState>, ws_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(INDEX_ROUTE, get(handlers::index))
        .route(ws_path, get(ws::ws_heatmap))
        .route(STATUS_ROUTE, get(handlers::status))
        .route(HEALTH_ROUTE, get(handlers::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
