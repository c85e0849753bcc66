//! Observability infrastructure for the monitor
//!
//! Provides:
//! - Prometheus metrics (probe latency, failures, window occupancy, model
//!   lifecycle counters)
//! - Structured JSON logging for significant monitor events

use prometheus::{
    register_gauge, register_histogram, register_int_gauge, Gauge, Histogram, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for probe round trips (in seconds)
const PROBE_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<SentinelMetricsInner> = OnceLock::new();

struct SentinelMetricsInner {
    probe_latency_seconds: Histogram,
    probes_total: IntGauge,
    probe_failures_total: IntGauge,
    samples_dropped_total: IntGauge,
    window_samples: IntGauge,
    availability_error_rate: Gauge,
    detector_warm: IntGauge,
    retrains_total: IntGauge,
    fit_errors_total: IntGauge,
    anomalies_total: IntGauge,
}

impl SentinelMetricsInner {
    fn new() -> Self {
        Self {
            probe_latency_seconds: register_histogram!(
                "latency_sentinel_probe_latency_seconds",
                "Round trip time of probes against the target",
                PROBE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register probe_latency_seconds"),

            probes_total: register_int_gauge!(
                "latency_sentinel_probes_total",
                "Total number of probe cycles completed"
            )
            .expect("Failed to register probes_total"),

            probe_failures_total: register_int_gauge!(
                "latency_sentinel_probe_failures_total",
                "Total number of probes that timed out or errored"
            )
            .expect("Failed to register probe_failures_total"),

            samples_dropped_total: register_int_gauge!(
                "latency_sentinel_samples_dropped_total",
                "Samples dropped because the detector backlog was full"
            )
            .expect("Failed to register samples_dropped_total"),

            window_samples: register_int_gauge!(
                "latency_sentinel_window_samples",
                "Successful samples currently held in the detection window"
            )
            .expect("Failed to register window_samples"),

            availability_error_rate: register_gauge!(
                "latency_sentinel_availability_error_rate",
                "Fraction of failed probes over the rolling availability record"
            )
            .expect("Failed to register availability_error_rate"),

            detector_warm: register_int_gauge!(
                "latency_sentinel_detector_warm",
                "1 once the detector has left cold start, 0 before"
            )
            .expect("Failed to register detector_warm"),

            retrains_total: register_int_gauge!(
                "latency_sentinel_retrains_total",
                "Total number of model refits"
            )
            .expect("Failed to register retrains_total"),

            fit_errors_total: register_int_gauge!(
                "latency_sentinel_fit_errors_total",
                "Total number of failed model fits"
            )
            .expect("Failed to register fit_errors_total"),

            anomalies_total: register_int_gauge!(
                "latency_sentinel_anomalies_total",
                "Total number of anomalous verdicts"
            )
            .expect("Failed to register anomalies_total"),
        }
    }
}

/// Handle to the global metrics instance; clones share the same metrics
#[derive(Clone)]
pub struct SentinelMetrics {
    _private: (),
}

impl Default for SentinelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SentinelMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SentinelMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &SentinelMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_probe_latency(&self, duration_secs: f64) {
        self.inner().probe_latency_seconds.observe(duration_secs);
    }

    pub fn inc_probes(&self) {
        self.inner().probes_total.inc();
    }

    pub fn inc_probe_failures(&self) {
        self.inner().probe_failures_total.inc();
    }

    pub fn inc_samples_dropped(&self) {
        self.inner().samples_dropped_total.inc();
    }

    pub fn set_window_samples(&self, count: i64) {
        self.inner().window_samples.set(count);
    }

    pub fn set_availability_error_rate(&self, rate: f64) {
        self.inner().availability_error_rate.set(rate);
    }

    pub fn set_detector_warm(&self, warm: bool) {
        self.inner().detector_warm.set(if warm { 1 } else { 0 });
    }

    pub fn set_retrains(&self, count: i64) {
        self.inner().retrains_total.set(count);
    }

    pub fn set_fit_errors(&self, count: i64) {
        self.inner().fit_errors_total.set(count);
    }

    pub fn inc_anomalies(&self) {
        self.inner().anomalies_total.inc();
    }
}

/// Structured logger for monitor lifecycle events
#[derive(Clone)]
pub struct StructuredLogger {
    target: String,
}

impl StructuredLogger {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64, window_size: usize) {
        info!(
            event = "monitor_started",
            target = %self.target,
            version = %version,
            probe_interval_secs = interval_secs,
            window_size = window_size,
            "Latency sentinel started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "monitor_shutdown",
            target = %self.target,
            reason = %reason,
            "Latency sentinel shutting down"
        );
    }

    pub fn log_probe_failure(&self, outcome: &str, error_rate: f64) {
        warn!(
            event = "probe_failed",
            target = %self.target,
            outcome = %outcome,
            error_rate = error_rate,
            "Probe against target failed"
        );
    }
}
