//! Active probing of the monitored target
//!
//! A prober issues one timed request per cycle and always yields a sample;
//! network failures are data for the availability record, never faults.

mod http;
mod r#loop;

pub use http::HttpProber;
pub use r#loop::{ProbeLoop, ProbeLoopBuilder, ProbeLoopConfig};

use crate::models::Sample;

pub use async_trait::async_trait;

/// Trait for probe implementations
#[async_trait]
pub trait Prober: Send + Sync {
    /// Issue one timed request against the configured target
    ///
    /// Infallible by contract: timeouts and transport errors come back as
    /// samples with the matching outcome.
    async fn probe(&self) -> Sample;
}
