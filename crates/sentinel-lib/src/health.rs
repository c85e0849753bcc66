//! Health tracking for the monitor's pipeline components
//!
//! Backs the liveness and readiness endpoints. The prober is marked
//! degraded while the target keeps failing (the monitor itself is fine,
//! detection freshness suffers) and unhealthy states flip readiness off.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a pipeline component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Operational but impaired, e.g. a string of failed probes
    Degraded,
    Unhealthy,
}

/// Snapshot of a single component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Aggregate health response served on /healthz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

/// Readiness response served on /readyz
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names registered at startup
pub mod components {
    pub const PROBER: &str = "prober";
    pub const DETECTOR: &str = "detector";
    pub const ALERTER: &str = "alerter";
}

/// Shared registry of component health and process readiness
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    inner: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.set_healthy(name).await;
    }

    pub async fn set_healthy(&self, name: &str) {
        let mut inner = self.inner.write().await;
        inner.insert(
            name.to_string(),
            ComponentHealth::with_status(ComponentStatus::Healthy, None),
        );
    }

    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.insert(
            name.to_string(),
            ComponentHealth::with_status(ComponentStatus::Degraded, Some(message.into())),
        );
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.insert(
            name.to_string(),
            ComponentHealth::with_status(ComponentStatus::Unhealthy, Some(message.into())),
        );
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Aggregate status: unhealthy dominates, then degraded
    pub async fn health(&self) -> HealthResponse {
        let components = self.inner.read().await.clone();

        let mut status = ComponentStatus::Healthy;
        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => {
                    status = ComponentStatus::Unhealthy;
                    break;
                }
                ComponentStatus::Degraded => status = ComponentStatus::Degraded,
                ComponentStatus::Healthy => {}
            }
        }

        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if !*self.ready.read().await {
            return ReadinessResponse {
                ready: false,
                reason: Some("Monitor not yet initialized".to_string()),
            };
        }

        let health = self.health().await;
        if health.status == ComponentStatus::Unhealthy {
            return ReadinessResponse {
                ready: false,
                reason: Some("Pipeline component unhealthy".to_string()),
            };
        }

        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}
