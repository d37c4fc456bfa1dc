//! Error types for the HTTP layer.
//!
//! [`ApiError`] converts into an Axum response with a small JSON body via
//! its [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::feed::FeedError;

/// Errors surfaced by REST handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The feed task is not running.
    #[error("feed unavailable: {0}")]
    FeedUnavailable(#[from] FeedError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::FeedUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_feed_maps_to_service_unavailable() {
        let response = ApiError::from(FeedError::Closed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
