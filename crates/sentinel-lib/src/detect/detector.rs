//! Latency anomaly detector
//!
//! Owns the sample window and the fitted model. Successful samples are
//! admitted to the window and scored; failed probes only move the rolling
//! availability counter. No verdicts are produced until the window has
//! `min_train_size` samples (cold start), after which the detector is warm
//! for the rest of the process lifetime.

use tracing::{debug, info, warn};

use super::forest::IsolationForest;
use super::window::{AvailabilityCounter, SampleWindow};
use crate::models::{Sample, Verdict};

/// Scores at or below this value can never classify as anomalous
///
/// A homogeneous window scores every point 0.5, and in-distribution points
/// stay well under 0.6; the floor keeps a quantile threshold computed over
/// such a window from flagging ordinary jitter.
const SCORE_FLOOR: f64 = 0.6;

/// Detector tuning parameters
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Window capacity W
    pub window_size: usize,
    /// Samples required before any verdict is produced
    pub min_train_size: usize,
    /// Expected fraction of anomalous points, drives the score threshold
    pub contamination: f64,
    /// Explicit score threshold; overrides the contamination quantile
    pub threshold: Option<f64>,
    /// Refit stride in admitted samples (1 = every cycle)
    pub retrain_every_k_samples: usize,
    /// Trees per forest
    pub num_trees: usize,
    /// RNG seed, fixed so fits are reproducible for a given window
    pub seed: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            window_size: 50,
            min_train_size: 20,
            contamination: 0.1,
            threshold: None,
            retrain_every_k_samples: 1,
            num_trees: 100,
            seed: 42,
        }
    }
}

/// Streaming latency anomaly detector with a bounded FIFO window
pub struct LatencyDetector {
    config: DetectorConfig,
    window: SampleWindow,
    availability: AvailabilityCounter,
    model: Option<IsolationForest>,
    threshold: f64,
    samples_since_fit: usize,
    warm: bool,
    retrains: u64,
    fit_failures: u64,
}

impl LatencyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        let window = SampleWindow::new(config.window_size);
        let availability = AvailabilityCounter::new(config.window_size);
        Self {
            config,
            window,
            availability,
            model: None,
            threshold: SCORE_FLOOR,
            samples_since_fit: 0,
            warm: false,
            retrains: 0,
            fit_failures: 0,
        }
    }

    /// Feed one probe result through the detector
    ///
    /// Returns `None` for failed probes, during cold start, and when a fit
    /// fails; otherwise the verdict for this sample against the most
    /// recently fitted model.
    pub fn observe(&mut self, sample: &Sample) -> Option<Verdict> {
        if !sample.is_ok() {
            self.availability.record(false);
            debug!(
                outcome = %sample.outcome,
                error_rate = self.availability.error_rate(),
                "Probe failure recorded as availability event"
            );
            return None;
        }
        self.availability.record(true);

        let latency_ms = sample.latency_ms?;
        self.window.push(sample.timestamp, latency_ms);
        self.samples_since_fit += 1;

        if self.window.len() < self.config.min_train_size {
            debug!(
                have = self.window.len(),
                need = self.config.min_train_size,
                "Cold start, verdict suppressed"
            );
            return None;
        }

        if !self.warm {
            self.warm = true;
            info!(
                samples = self.window.len(),
                "Detector warmed up, classification enabled"
            );
        }

        if self.model.is_none() || self.samples_since_fit >= self.config.retrain_every_k_samples {
            if !self.refit() {
                return None;
            }
        }

        let model = self.model.as_ref()?;
        let score = model.score(latency_ms);

        Some(Verdict {
            timestamp: sample.timestamp,
            latency_ms,
            score,
            is_anomalous: score > self.threshold,
            threshold: self.threshold,
        })
    }

    /// Rebuild the model from the full window; true on success
    fn refit(&mut self) -> bool {
        let latencies = self.window.latencies();
        match IsolationForest::fit(&latencies, self.config.num_trees, self.config.seed) {
            Ok(forest) => {
                self.threshold = match self.config.threshold {
                    Some(t) => t,
                    None => {
                        let scores = forest.score_batch(&latencies);
                        quantile_threshold(scores, self.config.contamination)
                    }
                };
                self.model = Some(forest);
                self.samples_since_fit = 0;
                self.retrains += 1;
                true
            }
            Err(e) => {
                // Recoverable: skip this cycle's verdict, window stays intact
                self.fit_failures += 1;
                warn!(error = %e, "Model fit failed, skipping verdict this cycle");
                false
            }
        }
    }

    pub fn is_warm(&self) -> bool {
        self.warm
    }

    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn error_rate(&self) -> f64 {
        self.availability.error_rate()
    }

    pub fn consecutive_failures(&self) -> usize {
        self.availability.consecutive_failures()
    }

    pub fn retrains(&self) -> u64 {
        self.retrains
    }

    pub fn fit_failures(&self) -> u64 {
        self.fit_failures
    }
}

/// Empirical `(1 - contamination)` quantile of the training scores,
/// clamped below by the score floor
fn quantile_threshold(mut scores: Vec<f64>, contamination: f64) -> f64 {
    if scores.is_empty() {
        return SCORE_FLOOR;
    }
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = ((1.0 - contamination) * scores.len() as f64).floor() as usize;
    let rank = rank.min(scores.len() - 1);

    scores[rank].max(SCORE_FLOOR)
}
