//! Monitor configuration
//!
//! Loaded from the environment with the `SENTINEL_` prefix. Invalid values
//! are fatal at startup; the monitor refuses to run on an undefined cadence
//! or window rather than degrade silently.

use anyhow::{bail, Context, Result};
use sentinel_lib::detect::DetectorConfig;
use serde::Deserialize;
use std::time::Duration;

/// Monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SentinelConfig {
    /// Base URL of the probed service
    #[serde(default)]
    pub target_url: String,

    /// Seconds between probe cycles
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Per-probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Latency window capacity W
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Samples required before classification starts
    #[serde(default = "default_min_train_size")]
    pub min_train_size: usize,

    /// Expected anomaly fraction, drives the score threshold
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Explicit score threshold overriding the contamination quantile
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Model refit stride in admitted samples
    #[serde(default = "default_retrain_every")]
    pub retrain_every_k_samples: usize,

    /// Trees per isolation forest
    #[serde(default = "default_num_trees")]
    pub num_trees: usize,

    /// Seed for reproducible model fits
    #[serde(default = "default_model_seed")]
    pub model_seed: u64,

    /// Minimum seconds between alert emissions, 0 disables rate limiting
    #[serde(default)]
    pub alert_dedup_secs: u64,

    /// Optional Alertmanager-compatible webhook for anomaly alerts
    #[serde(default)]
    pub alert_webhook_url: Option<String>,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,
}

fn default_probe_interval() -> u64 {
    5
}

fn default_probe_timeout() -> u64 {
    2
}

fn default_window_size() -> usize {
    50
}

fn default_min_train_size() -> usize {
    20
}

fn default_contamination() -> f64 {
    0.1
}

fn default_retrain_every() -> usize {
    1
}

fn default_num_trees() -> usize {
    100
}

fn default_model_seed() -> u64 {
    42
}

fn default_api_port() -> u16 {
    8080
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            target_url: String::new(),
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
            window_size: default_window_size(),
            min_train_size: default_min_train_size(),
            contamination: default_contamination(),
            threshold: None,
            retrain_every_k_samples: default_retrain_every(),
            num_trees: default_num_trees(),
            model_seed: default_model_seed(),
            alert_dedup_secs: 0,
            alert_webhook_url: None,
            api_port: default_api_port(),
        }
    }
}

impl SentinelConfig {
    /// Load configuration from the environment and validate it
    pub fn load() -> Result<Self> {
        let config: SentinelConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("SENTINEL").try_parsing(true))
            .build()?
            .try_deserialize()
            .context("Invalid monitor configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the monitor cannot safely run with
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            bail!("SENTINEL_TARGET_URL is required");
        }

        let normalized = if self.target_url.starts_with("http://")
            || self.target_url.starts_with("https://")
        {
            self.target_url.clone()
        } else {
            format!("http://{}", self.target_url)
        };
        url::Url::parse(&normalized)
            .with_context(|| format!("Invalid target_url: {}", self.target_url))?;

        if self.probe_interval_secs == 0 {
            bail!("probe_interval_secs must be positive");
        }
        if self.probe_timeout_secs == 0 {
            bail!("probe_timeout_secs must be positive");
        }
        if self.window_size == 0 {
            bail!("window_size must be positive");
        }
        if self.min_train_size == 0 || self.min_train_size > self.window_size {
            bail!(
                "min_train_size must be in 1..={} (got {})",
                self.window_size,
                self.min_train_size
            );
        }
        if self.contamination <= 0.0 || self.contamination > 0.5 {
            bail!(
                "contamination must be in (0, 0.5] (got {})",
                self.contamination
            );
        }
        if self.retrain_every_k_samples == 0 {
            bail!("retrain_every_k_samples must be positive");
        }
        if self.num_trees == 0 {
            bail!("num_trees must be positive");
        }
        if let Some(t) = self.threshold {
            if t <= 0.0 {
                bail!("threshold must be positive (got {})", t);
            }
        }
        if let Some(url) = &self.alert_webhook_url {
            url::Url::parse(url).with_context(|| format!("Invalid alert_webhook_url: {}", url))?;
        }

        Ok(())
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            window_size: self.window_size,
            min_train_size: self.min_train_size,
            contamination: self.contamination,
            threshold: self.threshold,
            retrain_every_k_samples: self.retrain_every_k_samples,
            num_trees: self.num_trees,
            seed: self.model_seed,
        }
    }
}
