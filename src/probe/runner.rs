use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{Prober, Target};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ProbeLoopConfig {
    pub interval: Duration,
}

impl Default for ProbeLoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProbeStats {
    pub target: String,
    pub probes: usize,
    pub bytes_total: u64,
    pub latency_total: Duration,
    pub latency_max: Duration,
}

impl ProbeStats {
    fn new(target: &Target) -> Self {
        Self {
            target: target.name().to_string(),
            ..Self::default()
        }
    }

    pub fn avg_latency(&self) -> Duration {
        if self.probes == 0 {
            Duration::ZERO
        } else {
            self.latency_total / self.probes as u32
        }
    }
}

/// One in-flight set of probe loops. Every spawned handle must be stopped
/// before the run ends so no background task outlives the harness.
pub struct RunHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<Result<ProbeStats>>>,
}

impl RunHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels every loop and waits for all of them to acknowledge exit.
    /// Returns the per-target stats, or the first probe error if any loop
    /// terminated early. All tasks are joined either way.
    pub async fn stop(self) -> Result<Vec<ProbeStats>> {
        self.token.cancel();

        let mut stats = Vec::with_capacity(self.tasks.len());
        let mut first_error = None;

        for joined in join_all(self.tasks).await {
            match joined {
                Ok(Ok(s)) => stats.push(s),
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_error) => {
                    if first_error.is_none() {
                        first_error = Some(Error::Join(join_error));
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}

/// Sustained periodic load against a set of targets, simulating concurrent
/// external scrapers. Each target gets its own independent loop; probes of
/// one target never block another's.
pub struct ProbeLoop {
    prober: Arc<dyn Prober>,
    config: ProbeLoopConfig,
}

impl ProbeLoop {
    pub fn new(prober: impl Prober + 'static, config: ProbeLoopConfig) -> Self {
        Self {
            prober: Arc::new(prober),
            config,
        }
    }

    pub fn spawn(&self, targets: Vec<Target>) -> RunHandle {
        let token = CancellationToken::new();

        let tasks = targets
            .into_iter()
            .map(|target| {
                let prober = Arc::clone(&self.prober);
                let tick = self.config.interval;
                let token = token.clone();
                tokio::spawn(Self::run_target(prober, tick, target, token))
            })
            .collect();

        RunHandle { token, tasks }
    }

    async fn run_target(
        prober: Arc<dyn Prober>,
        tick: Duration,
        target: Target,
        token: CancellationToken,
    ) -> Result<ProbeStats> {
        let mut stats = ProbeStats::new(&target);
        let mut ticker = interval(tick);
        // Probes against one target are strictly sequential; a slow probe
        // delays the next tick instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // probe fires one full interval after launch.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    debug!(target = %stats.target, probes = stats.probes, "probe loop cancelled");
                    return Ok(stats);
                }
                _ = ticker.tick() => {}
            }

            let result = prober.probe(&target).await?;

            stats.probes += 1;
            stats.bytes_total += result.body_bytes as u64;
            stats.latency_total += result.elapsed;
            stats.latency_max = stats.latency_max.max(result.elapsed);

            trace!(
                target = %stats.target,
                bytes = result.body_bytes,
                latency = ?result.elapsed,
                "probe complete"
            );
        }
    }
}
