//! Core library for the latency sentinel
//!
//! This crate provides:
//! - Timed HTTP probing of a target service
//! - Streaming anomaly detection over a bounded latency window
//! - Alert formatting and sink dispatch
//! - Health checks and observability

pub mod detect;
pub mod health;
pub mod models;
pub mod observability;
pub mod probe;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{SentinelMetrics, StructuredLogger};
