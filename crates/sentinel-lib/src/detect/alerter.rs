//! Alert emission for anomalous latency verdicts
//!
//! Handles:
//! - Structured alert events (timestamp, latency, score, threshold)
//! - Formatting alerts for an Alertmanager-compatible webhook
//! - Optional rate limiting of repeated alerts

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::Verdict;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Structured event handed to alert sinks, one per anomalous verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// RFC3339 timestamp of the offending sample
    pub starts_at: String,
    /// Probed target
    pub target: String,
    pub latency_ms: f64,
    pub score: f64,
    pub threshold: f64,
}

impl AlertEvent {
    pub fn from_verdict(target: &str, verdict: &Verdict) -> Self {
        let starts_at = Utc
            .timestamp_opt(verdict.timestamp, 0)
            .single()
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        Self {
            starts_at,
            target: target.to_string(),
            latency_ms: verdict.latency_ms,
            score: verdict.score,
            threshold: verdict.threshold,
        }
    }

    /// Scores far above the threshold escalate to critical
    pub fn severity(&self) -> AlertSeverity {
        if self.score >= 0.9 {
            AlertSeverity::Critical
        } else {
            AlertSeverity::Warning
        }
    }
}

/// Single capability required from an alert collaborator
///
/// Delivery guarantees (buffering, retries) belong to the sink, not the
/// monitor.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn emit(&self, event: &AlertEvent) -> Result<()>;
}

/// Sink that emits alerts as structured log events
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn emit(&self, event: &AlertEvent) -> Result<()> {
        warn!(
            event = "latency_anomaly",
            target = %event.target,
            starts_at = %event.starts_at,
            latency_ms = event.latency_ms,
            score = event.score,
            threshold = event.threshold,
            severity = %event.severity(),
            "Latency anomaly detected"
        );
        Ok(())
    }
}

/// Alertmanager webhook alert format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertmanagerAlert {
    /// Alert status (firing or resolved)
    pub status: String,
    /// Alert labels for routing and grouping
    pub labels: HashMap<String, String>,
    /// Alert annotations with details
    pub annotations: HashMap<String, String>,
    /// Start time in RFC3339 format
    pub starts_at: String,
}

/// Alertmanager webhook payload (array of alerts)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertmanagerPayload {
    pub alerts: Vec<AlertmanagerAlert>,
}

/// Build the Alertmanager representation of an alert event
pub fn alertmanager_alert(event: &AlertEvent) -> AlertmanagerAlert {
    let mut labels = HashMap::new();
    labels.insert("alertname".to_string(), "TargetLatencyAnomaly".to_string());
    labels.insert("severity".to_string(), event.severity().to_string());
    labels.insert("target".to_string(), event.target.clone());

    let mut annotations = HashMap::new();
    annotations.insert(
        "summary".to_string(),
        format!("Anomalous latency on {}", event.target),
    );
    annotations.insert(
        "description".to_string(),
        format!(
            "Response latency {:.1}ms scored {:.3} against threshold {:.3}",
            event.latency_ms, event.score, event.threshold
        ),
    );
    annotations.insert("latency_ms".to_string(), format!("{:.1}", event.latency_ms));
    annotations.insert("score".to_string(), format!("{:.4}", event.score));
    annotations.insert("threshold".to_string(), format!("{:.4}", event.threshold));

    AlertmanagerAlert {
        status: "firing".to_string(),
        labels,
        annotations,
        starts_at: event.starts_at.clone(),
    }
}

/// Sink that POSTs Alertmanager payloads to a webhook
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn emit(&self, event: &AlertEvent) -> Result<()> {
        let payload = AlertmanagerPayload {
            alerts: vec![alertmanager_alert(event)],
        };

        let response = self.client.post(&self.url).json(&payload).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}

/// Fan-out dispatcher with optional rate limiting
///
/// A zero dedup window disables suppression so every anomalous verdict
/// alerts. Sink failures are logged and never propagate; a broken webhook
/// must not take the monitor down.
pub struct Alerter {
    sinks: Vec<Box<dyn AlertSink>>,
    dedup_window: Duration,
    last_emitted: RwLock<Option<Instant>>,
}

impl Alerter {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            dedup_window: Duration::ZERO,
            last_emitted: RwLock::new(None),
        }
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = window;
        self
    }

    pub fn add_sink(mut self, sink: Box<dyn AlertSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    fn should_suppress(&self) -> bool {
        if self.dedup_window.is_zero() {
            return false;
        }
        let last = self.last_emitted.read().unwrap();
        last.map(|t| t.elapsed() < self.dedup_window).unwrap_or(false)
    }

    fn record_emission(&self) {
        let mut last = self.last_emitted.write().unwrap();
        *last = Some(Instant::now());
    }

    /// Send the event to every sink; returns false when suppressed
    pub async fn dispatch(&self, event: &AlertEvent) -> bool {
        if self.should_suppress() {
            return false;
        }
        self.record_emission();

        for sink in &self.sinks {
            if let Err(e) = sink.emit(event).await {
                warn!(error = %e, target = %event.target, "Alert sink emission failed");
            }
        }
        true
    }
}

impl Default for Alerter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_event() -> AlertEvent {
        AlertEvent {
            starts_at: "2024-01-01T00:00:00+00:00".to_string(),
            target: "http://backend:80".to_string(),
            latency_ms: 5000.0,
            score: 0.87,
            threshold: 0.6,
        }
    }

    /// Sink that counts emissions
    struct CountingSink {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AlertSink for CountingSink {
        async fn emit(&self, _event: &AlertEvent) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Sink that always fails
    struct FailingSink;

    #[async_trait]
    impl AlertSink for FailingSink {
        async fn emit(&self, _event: &AlertEvent) -> Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[tokio::test]
    async fn test_dispatch_without_dedup_emits_every_time() {
        let count = Arc::new(AtomicUsize::new(0));
        let alerter = Alerter::new().add_sink(Box::new(CountingSink {
            count: count.clone(),
        }));

        let event = test_event();
        assert!(alerter.dispatch(&event).await);
        assert!(alerter.dispatch(&event).await);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_dispatch_dedup_suppresses_within_window() {
        let count = Arc::new(AtomicUsize::new(0));
        let alerter = Alerter::new()
            .with_dedup_window(Duration::from_millis(100))
            .add_sink(Box::new(CountingSink {
                count: count.clone(),
            }));

        let event = test_event();
        assert!(alerter.dispatch(&event).await);
        assert!(!alerter.dispatch(&event).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(alerter.dispatch(&event).await);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_dispatch() {
        let count = Arc::new(AtomicUsize::new(0));
        let alerter = Alerter::new()
            .add_sink(Box::new(FailingSink))
            .add_sink(Box::new(CountingSink {
                count: count.clone(),
            }));

        assert!(alerter.dispatch(&test_event()).await);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alertmanager_alert_formatting() {
        let alert = alertmanager_alert(&test_event());

        assert_eq!(alert.status, "firing");
        assert_eq!(
            alert.labels.get("alertname").unwrap(),
            "TargetLatencyAnomaly"
        );
        assert_eq!(alert.labels.get("target").unwrap(), "http://backend:80");
        assert!(alert
            .annotations
            .get("description")
            .unwrap()
            .contains("5000.0ms"));
        assert_eq!(alert.annotations.get("score").unwrap(), "0.8700");
    }

    #[test]
    fn test_event_severity_levels() {
        let mut event = test_event();
        assert_eq!(event.severity(), AlertSeverity::Warning);

        event.score = 0.93;
        assert_eq!(event.severity(), AlertSeverity::Critical);
    }

    #[test]
    fn test_event_from_verdict() {
        let verdict = Verdict {
            timestamp: 1704067200,
            latency_ms: 4200.0,
            score: 0.8,
            is_anomalous: true,
            threshold: 0.6,
        };

        let event = AlertEvent::from_verdict("http://backend:80", &verdict);
        assert!(event.starts_at.starts_with("2024-01-01T00:00:00"));
        assert_eq!(event.latency_ms, 4200.0);
    }
}
