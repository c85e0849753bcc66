//! Latency anomaly detection
//!
//! This module provides:
//! - A bounded FIFO window of recent successful samples
//! - An isolation forest rebuilt from the window on a configurable stride
//! - The streaming detector with cold-start suppression
//! - Alert formatting and sink dispatch

mod alerter;
mod detector;
mod forest;
mod r#loop;
mod window;

pub use alerter::{
    alertmanager_alert, AlertEvent, AlertSeverity, AlertSink, Alerter, AlertmanagerAlert,
    AlertmanagerPayload, LogSink, WebhookSink,
};
pub use detector::{DetectorConfig, LatencyDetector};
pub use forest::{FitError, IsolationForest};
pub use r#loop::DetectorLoop;
pub use window::{AvailabilityCounter, SampleWindow};
