//! REST handlers: map page, feed status and health.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::{Html, IntoResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// Serve the map page.
///
/// # Route
///
/// `GET /`
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.page.clone())
}

/// Return the current feed status.
///
/// # Route
///
/// `GET /api/status`
pub async fn status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let status = state.feed.status().await?;
    Ok(Json(status))
}

/// Liveness probe.
///
/// # Route
///
/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
