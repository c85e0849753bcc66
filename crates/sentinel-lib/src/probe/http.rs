//! HTTP prober measuring request round trip time

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use super::Prober;
use crate::models::Sample;

/// Probes a target URL with plain GET requests
///
/// The clock runs from send until response headers arrive. Any HTTP status
/// counts as a successful probe; status semantics belong to the target,
/// the monitor only cares that it answered.
pub struct HttpProber {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(target: &str, timeout: Duration) -> Result<Self> {
        let url = if target.starts_with("http://") || target.starts_with("https://") {
            target.to_string()
        } else {
            format!("http://{}", target)
        };
        url::Url::parse(&url).with_context(|| format!("Invalid probe target: {}", target))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn probe(&self) -> Sample {
        let timestamp = Utc::now().timestamp();
        let start = Instant::now();
        let result = self.client.get(&self.url).send().await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                debug!(
                    status = response.status().as_u16(),
                    latency_ms = elapsed_ms,
                    "Probe completed"
                );
                Sample::ok(timestamp, elapsed_ms)
            }
            Err(e) if e.is_timeout() => {
                Sample::timeout(timestamp, self.timeout.as_secs_f64() * 1000.0)
            }
            Err(e) => {
                debug!(error = %e, "Probe transport error");
                Sample::error(timestamp)
            }
        }
    }
}
