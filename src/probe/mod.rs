pub mod client;
pub mod runner;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{ProbeClient, ProbeClientConfig, ProbeResult, Scheme, Target};
pub use runner::{ProbeLoop, ProbeLoopConfig, ProbeStats, RunHandle};

/// Seam between the loop and the transport, so tests can drive the loop with
/// a scripted prober and callers can substitute a certificate-verifying
/// client.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target) -> Result<ProbeResult>;
}
