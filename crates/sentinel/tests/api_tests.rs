//! Integration tests for the monitor API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use sentinel_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::SentinelMetrics,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Mirror of the binary's API state
#[derive(Clone)]
pub struct ApiState {
    pub health_registry: HealthRegistry,
}

async fn healthz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

fn create_test_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn setup_test_app() -> (Router, Arc<ApiState>, SentinelMetrics) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::PROBER).await;
    health_registry.register(components::DETECTOR).await;

    let state = Arc::new(ApiState { health_registry });
    let router = create_test_router(state.clone());

    (router, state, SentinelMetrics::new())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state, _metrics) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_target_flaky() {
    let (app, state, _metrics) = setup_test_app().await;

    // A failing target degrades the prober but the monitor stays up
    state
        .health_registry
        .set_degraded(components::PROBER, "3 consecutive probe failures")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state, _metrics) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::DETECTOR, "Detector task exited")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_returns_503_when_not_ready() {
    let (app, _state, _metrics) = setup_test_app().await;

    // By default, the monitor is not ready
    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state, _metrics) = setup_test_app().await;

    state.health_registry.set_ready(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_readyz_returns_503_when_ready_but_unhealthy() {
    let (app, state, _metrics) = setup_test_app().await;

    state.health_registry.set_ready(true).await;
    state
        .health_registry
        .set_unhealthy(components::DETECTOR, "Failed")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _state, metrics) = setup_test_app().await;

    metrics.observe_probe_latency(0.120);
    metrics.inc_probes();
    metrics.set_window_samples(25);
    metrics.set_detector_warm(true);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("latency_sentinel_probe_latency_seconds"));
    assert!(metrics_text.contains("latency_sentinel_probes_total"));
    assert!(metrics_text.contains("latency_sentinel_window_samples"));
    assert!(metrics_text.contains("latency_sentinel_detector_warm"));
}

#[tokio::test]
async fn test_metrics_contains_histogram_buckets() {
    let (app, _state, metrics) = setup_test_app().await;

    metrics.observe_probe_latency(0.010);
    metrics.observe_probe_latency(0.080);
    metrics.observe_probe_latency(1.500);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("latency_sentinel_probe_latency_seconds_bucket"));
    assert!(metrics_text.contains("latency_sentinel_probe_latency_seconds_count"));
    assert!(metrics_text.contains("latency_sentinel_probe_latency_seconds_sum"));
}

#[tokio::test]
async fn test_healthz_includes_component_details() {
    let (app, _state, _metrics) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert!(health["components"].is_object());
    assert!(health["components"]["prober"].is_object());
    assert!(health["components"]["detector"].is_object());
}
