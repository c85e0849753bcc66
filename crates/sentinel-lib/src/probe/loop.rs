//! Probe cadence loop
//!
//! Runs one probe per interval and hands samples to the detector over a
//! bounded channel. Exactly one probe is in flight at a time: the probe is
//! awaited inside the tick arm and missed ticks are delayed, so an
//! overrunning probe pushes the next cycle back instead of stacking.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::Prober;
use crate::models::Sample;
use crate::observability::SentinelMetrics;

/// Configuration for the probe loop
#[derive(Debug, Clone)]
pub struct ProbeLoopConfig {
    /// Cadence between probe cycles
    pub interval: Duration,
    /// Sample channel capacity toward the detector
    pub buffer_size: usize,
}

impl Default for ProbeLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            buffer_size: 64,
        }
    }
}

/// Periodic probe driver feeding the detection pipeline
pub struct ProbeLoop {
    prober: Arc<dyn Prober>,
    config: ProbeLoopConfig,
    metrics: SentinelMetrics,
    sample_tx: mpsc::Sender<Sample>,
}

impl ProbeLoop {
    pub fn new(
        prober: Arc<dyn Prober>,
        config: ProbeLoopConfig,
        metrics: SentinelMetrics,
    ) -> (Self, mpsc::Receiver<Sample>) {
        let (sample_tx, sample_rx) = mpsc::channel(config.buffer_size);

        let loop_instance = Self {
            prober,
            config,
            metrics,
            sample_tx,
        };

        (loop_instance, sample_rx)
    }

    /// Run until the shutdown signal fires
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting probe loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycle_count = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sample = self.prober.probe().await;
                    cycle_count += 1;

                    self.metrics.inc_probes();
                    match sample.latency_ms {
                        Some(ms) if sample.is_ok() => {
                            self.metrics.observe_probe_latency(ms / 1000.0);
                        }
                        _ => self.metrics.inc_probe_failures(),
                    }

                    if cycle_count % 12 == 0 {
                        debug!(cycles = cycle_count, "Probe loop heartbeat");
                    }

                    // Never block the cadence on a slow detector: a full
                    // backlog drops the freshest sample instead
                    if self.sample_tx.try_send(sample).is_err() {
                        self.metrics.inc_samples_dropped();
                        warn!("Detector backlog full, dropping sample");
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down probe loop");
                    break;
                }
            }
        }
    }
}

/// Builder for creating the probe loop
pub struct ProbeLoopBuilder {
    prober: Option<Arc<dyn Prober>>,
    config: ProbeLoopConfig,
    metrics: Option<SentinelMetrics>,
}

impl ProbeLoopBuilder {
    pub fn new() -> Self {
        Self {
            prober: None,
            config: ProbeLoopConfig::default(),
            metrics: None,
        }
    }

    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    pub fn metrics(mut self, metrics: SentinelMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<(ProbeLoop, mpsc::Receiver<Sample>)> {
        let prober = self
            .prober
            .ok_or_else(|| anyhow::anyhow!("Prober is required"))?;
        let metrics = self.metrics.unwrap_or_default();

        Ok(ProbeLoop::new(prober, self.config, metrics))
    }
}

impl Default for ProbeLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
