//! HTTP surface for health checks and Prometheus metrics
//!
//! Serves /healthz, /readyz and /metrics next to the probe pipeline. The
//! server participates in the same shutdown broadcast as the loops, so a
//! signal stops the whole process instead of leaving the listener behind.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use sentinel_lib::health::{ComponentStatus, HealthRegistry};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// State shared by the API handlers
#[derive(Clone)]
pub struct ApiState {
    pub health_registry: HealthRegistry,
}

/// Liveness endpoint
///
/// A degraded prober means the *target* keeps failing; the monitor itself
/// is alive and still probing, so degraded stays 200.
async fn healthz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness endpoint, 200 once the pipeline is wired up
async fn readyz(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus exposition endpoint
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

/// Build the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the API until the shutdown broadcast fires
pub async fn serve(
    port: u16,
    state: Arc<ApiState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            info!("Shutting down API server");
        })
        .await?;

    Ok(())
}
