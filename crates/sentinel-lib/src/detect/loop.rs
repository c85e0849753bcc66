//! Detection pipeline loop
//!
//! Sole consumer of the sample channel and sole writer of the detection
//! window. Retraining happens here, off the probe task, so a slow fit can
//! never delay the probe cadence.

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use super::alerter::{AlertEvent, Alerter};
use super::detector::LatencyDetector;
use crate::health::{components, HealthRegistry};
use crate::models::Sample;
use crate::observability::{SentinelMetrics, StructuredLogger};

/// Consecutive probe failures before the prober is reported degraded
const DEGRADED_AFTER_FAILURES: usize = 3;

/// Drives the detector over incoming samples and dispatches alerts
pub struct DetectorLoop {
    detector: LatencyDetector,
    alerter: Alerter,
    target: String,
    metrics: SentinelMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
    sample_rx: mpsc::Receiver<Sample>,
}

impl DetectorLoop {
    pub fn new(
        detector: LatencyDetector,
        alerter: Alerter,
        target: impl Into<String>,
        sample_rx: mpsc::Receiver<Sample>,
        metrics: SentinelMetrics,
        health: HealthRegistry,
    ) -> Self {
        let target = target.into();
        let logger = StructuredLogger::new(target.clone());

        Self {
            detector,
            alerter,
            target,
            metrics,
            health,
            logger,
            sample_rx,
        }
    }

    /// Run until the shutdown signal fires or the sample channel closes
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!("Starting detector loop");

        loop {
            tokio::select! {
                maybe_sample = self.sample_rx.recv() => {
                    match maybe_sample {
                        Some(sample) => self.handle_sample(sample).await,
                        None => {
                            info!("Sample channel closed, stopping detector loop");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down detector loop");
                    break;
                }
            }
        }
    }

    async fn handle_sample(&mut self, sample: Sample) {
        let verdict = self.detector.observe(&sample);

        if !sample.is_ok() {
            self.logger
                .log_probe_failure(&sample.outcome.to_string(), self.detector.error_rate());
        }

        self.publish_detector_state();
        self.update_prober_health(&sample).await;

        if let Some(verdict) = verdict {
            if verdict.is_anomalous {
                self.metrics.inc_anomalies();
                let event = AlertEvent::from_verdict(&self.target, &verdict);
                self.alerter.dispatch(&event).await;
            }
        }
    }

    fn publish_detector_state(&self) {
        self.metrics
            .set_window_samples(self.detector.window_len() as i64);
        self.metrics
            .set_availability_error_rate(self.detector.error_rate());
        self.metrics.set_detector_warm(self.detector.is_warm());
        self.metrics.set_retrains(self.detector.retrains() as i64);
        self.metrics
            .set_fit_errors(self.detector.fit_failures() as i64);
    }

    async fn update_prober_health(&self, sample: &Sample) {
        let failures = self.detector.consecutive_failures();
        if failures >= DEGRADED_AFTER_FAILURES {
            self.health
                .set_degraded(
                    components::PROBER,
                    format!("{} consecutive probe failures", failures),
                )
                .await;
        } else if sample.is_ok() {
            self.health.set_healthy(components::PROBER).await;
        }
    }
}
