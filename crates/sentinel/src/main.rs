//! Latency sentinel - operational-health monitor
//!
//! Probes a target service on a fixed cadence and flags statistically
//! anomalous latency spikes with an isolation forest refit over a rolling
//! window of recent samples.

use anyhow::Result;
use sentinel_lib::{
    detect::{Alerter, DetectorLoop, LatencyDetector, LogSink, WebhookSink},
    health::{components, HealthRegistry},
    observability::{SentinelMetrics, StructuredLogger},
    probe::{HttpProber, ProbeLoopBuilder},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const SENTINEL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting latency-sentinel");

    // Invalid configuration refuses to run
    let config = config::SentinelConfig::load()?;

    let prober = Arc::new(HttpProber::new(&config.target_url, config.probe_timeout())?);
    let target = prober.url().to_string();
    info!(target = %target, "Monitor configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::PROBER).await;
    health_registry.register(components::DETECTOR).await;
    health_registry.register(components::ALERTER).await;

    // Initialize metrics and structured logging
    let metrics = SentinelMetrics::new();
    let logger = StructuredLogger::new(target.clone());
    logger.log_startup(
        SENTINEL_VERSION,
        config.probe_interval_secs,
        config.window_size,
    );

    // Pipeline and API share one shutdown broadcast
    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    // Start health and metrics server
    let api_state = Arc::new(api::ApiState {
        health_registry: health_registry.clone(),
    });
    let api_handle = tokio::spawn(api::serve(
        config.api_port,
        api_state,
        shutdown_tx.subscribe(),
    ));

    // Pipeline wiring: prober -> bounded channel -> detector -> alerter
    let (probe_loop, sample_rx) = ProbeLoopBuilder::new()
        .prober(prober)
        .interval(config.probe_interval())
        .metrics(metrics.clone())
        .build()?;

    let mut alerter = Alerter::new()
        .with_dedup_window(Duration::from_secs(config.alert_dedup_secs))
        .add_sink(Box::new(LogSink));
    if let Some(url) = &config.alert_webhook_url {
        alerter = alerter.add_sink(Box::new(WebhookSink::new(url.clone())));
    }

    let detector = LatencyDetector::new(config.detector_config());
    let detector_loop = DetectorLoop::new(
        detector,
        alerter,
        target,
        sample_rx,
        metrics.clone(),
        health_registry.clone(),
    );

    let probe_handle = tokio::spawn(probe_loop.run(shutdown_tx.subscribe()));
    let detector_handle = tokio::spawn(detector_loop.run(shutdown_tx.subscribe()));

    // Mark ready once the pipeline is wired
    health_registry.set_ready(true).await;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    let _ = probe_handle.await;
    let _ = detector_handle.await;
    let _ = api_handle.await;

    Ok(())
}
