//! Integration tests for the REST endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use heatfeed_server::config::HeatfeedConfig;
use heatfeed_server::{build_router, start_feed};
use serde_json::Value;
use tower::ServiceExt;

fn test_config() -> HeatfeedConfig {
    let mut config = HeatfeedConfig::default();
    config.feed.gathering_active = false;
    config.feed.seed = Some(7);
    config
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_index_returns_map_page() {
    let config = test_config();
    let running = start_feed(&config).unwrap();
    let router = build_router(running.state, &config.server.ws_path);

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("L.heatLayer"));
    assert!(html.contains("/heatmap-updates"));
}

#[tokio::test]
async fn test_status_reports_initial_state() {
    let config = test_config();
    let running = start_feed(&config).unwrap();
    let router = build_router(running.state, &config.server.ws_path);

    let response = router
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["intensity"], 0.5);
    assert_eq!(json["crowd_count"], 500);
    assert_eq!(json["update_count"], 0);
    assert_eq!(json["gathering_active"], false);
    assert_eq!(json["viewers"], 0);
    // Cluster of 5 + round(0.5 * 15) = 13 points plus 9 background cities.
    assert_eq!(json["point_count"], 13 + 9);
}

#[tokio::test]
async fn test_status_when_feed_stopped() {
    let config = test_config();
    let running = start_feed(&config).unwrap();
    running.feed_task.abort();
    let _ = running.feed_task.await;
    let router = build_router(running.state, &config.server.ws_path);

    let response = router
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 503);
}

#[tokio::test]
async fn test_health() {
    let config = test_config();
    let running = start_feed(&config).unwrap();
    let router = build_router(running.state, &config.server.ws_path);

    let response = router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let config = test_config();
    let running = start_feed(&config).unwrap();
    let router = build_router(running.state, &config.server.ws_path);

    let response = router
        .oneshot(Request::get("/api/agents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
