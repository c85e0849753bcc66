//! Core data models for the latency sentinel

use serde::{Deserialize, Serialize};

/// Outcome of a single probe cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// Target answered within the timeout
    Ok,
    /// No response before the configured timeout
    Timeout,
    /// Connection or protocol failure before any response
    Error,
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeOutcome::Ok => write!(f, "ok"),
            ProbeOutcome::Timeout => write!(f, "timeout"),
            ProbeOutcome::Error => write!(f, "error"),
        }
    }
}

/// One timed probe result, immutable once recorded
///
/// `latency_ms` is the measured round trip for `Ok`, the timeout bound for
/// `Timeout`, and absent for `Error` (no response was ever observed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: i64,
    pub latency_ms: Option<f64>,
    pub outcome: ProbeOutcome,
}

impl Sample {
    pub fn ok(timestamp: i64, latency_ms: f64) -> Self {
        Self {
            timestamp,
            latency_ms: Some(latency_ms),
            outcome: ProbeOutcome::Ok,
        }
    }

    pub fn timeout(timestamp: i64, timeout_bound_ms: f64) -> Self {
        Self {
            timestamp,
            latency_ms: Some(timeout_bound_ms),
            outcome: ProbeOutcome::Timeout,
        }
    }

    pub fn error(timestamp: i64) -> Self {
        Self {
            timestamp,
            latency_ms: None,
            outcome: ProbeOutcome::Error,
        }
    }

    /// True when the sample is admissible to the latency window
    pub fn is_ok(&self) -> bool {
        self.outcome == ProbeOutcome::Ok
    }
}

/// Per-sample classification output
///
/// Produced once the detector is warm, consumed by the alert path and
/// dropped; nothing downstream retains verdicts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub timestamp: i64,
    pub latency_ms: f64,
    pub score: f64,
    pub is_anomalous: bool,
    pub threshold: f64,
}
