use std::fmt::Write as _;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::container::{Environment, ProcessSpec};
use crate::error::{Error, Result};
use crate::interactive;
use crate::monitor::{GraphQuery, Monitoring, MonitoringOptions, ScrapeJob};
use crate::probe::{
    ProbeClient, ProbeClientConfig, ProbeLoop, ProbeLoopConfig, ProbeStats, Target,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessState {
    Uninitialized,
    EnvironmentReady,
    MonitoringReady,
    ProcessesReady,
    Running,
    Stopping,
    Terminated,
}

#[derive(Debug, Clone)]
pub enum StopCondition {
    /// Hold until the operator hits the local callback endpoint.
    Interactive,
    /// Hold for a fixed duration, then stop.
    After(Duration),
}

#[derive(Debug, Clone)]
struct ProbeSpec {
    process: String,
    port: String,
    path: String,
}

/// Sequences the whole run: environment, monitoring, dependent processes,
/// probe loops, the operator hold, and teardown. Environment teardown always
/// runs exactly once, failure or not, and a spawned probe loop is always
/// stopped and joined before the run returns.
pub struct BenchHarness {
    name: String,
    processes: Vec<ProcessSpec>,
    probes: Vec<ProbeSpec>,
    extra_targets: Vec<Target>,
    client_config: ProbeClientConfig,
    loop_config: ProbeLoopConfig,
    monitoring: Option<MonitoringOptions>,
    graphs: Vec<GraphQuery>,
    warmup: Duration,
    stop: StopCondition,
}

impl BenchHarness {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processes: Vec::new(),
            probes: Vec::new(),
            extra_targets: Vec::new(),
            client_config: ProbeClientConfig::default(),
            loop_config: ProbeLoopConfig::default(),
            monitoring: None,
            graphs: Vec::new(),
            warmup: Duration::from_secs(5),
            stop: StopCondition::Interactive,
        }
    }

    #[must_use]
    pub fn process(mut self, spec: ProcessSpec) -> Self {
        self.processes.push(spec);
        self
    }

    /// Probe a registered process on one of its named ports.
    #[must_use]
    pub fn probe(
        mut self,
        process: impl Into<String>,
        port: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        self.probes.push(ProbeSpec {
            process: process.into(),
            port: port.into(),
            path: path.into(),
        });
        self
    }

    /// Probe an externally managed target that is not part of the
    /// environment.
    #[must_use]
    pub fn target(mut self, target: Target) -> Self {
        self.extra_targets.push(target);
        self
    }

    #[must_use]
    pub fn client(mut self, config: ProbeClientConfig) -> Self {
        self.client_config = config;
        self
    }

    #[must_use]
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.loop_config.interval = interval;
        self
    }

    #[must_use]
    pub fn monitoring(mut self, options: MonitoringOptions) -> Self {
        self.monitoring = Some(options);
        self
    }

    #[must_use]
    pub fn graph(mut self, graph: GraphQuery) -> Self {
        self.graphs.push(graph);
        self
    }

    #[must_use]
    pub fn warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    #[must_use]
    pub fn stop_after(mut self, duration: Duration) -> Self {
        self.stop = StopCondition::After(duration);
        self
    }

    pub async fn run(self) -> Result<BenchReport> {
        let mut state = HarnessState::Uninitialized;
        let mut env = Environment::new(&self.name);
        transition(&mut state, HarnessState::EnvironmentReady);

        let result = self.run_inner(&mut env, &mut state).await;
        if let Err(e) = &result {
            error!(error = %e, "run failed, tearing down");
        }

        let teardown = env.close().await;
        transition(&mut state, HarnessState::Terminated);

        let report = result?;
        teardown?;
        Ok(report)
    }

    async fn run_inner(
        &self,
        env: &mut Environment,
        state: &mut HarnessState,
    ) -> Result<BenchReport> {
        let monitoring = match &self.monitoring {
            Some(options) => {
                let mut options = options.clone();
                for job in self.derived_scrape_jobs(env) {
                    options = options.job(job);
                }
                Some(Monitoring::start(env, options).await?)
            }
            None => None,
        };
        transition(state, HarnessState::MonitoringReady);

        for spec in &self.processes {
            env.start_and_wait_ready(spec.clone()).await?;
        }
        transition(state, HarnessState::ProcessesReady);

        if !self.warmup.is_zero() {
            info!(warmup = ?self.warmup, "letting processes warm up");
            sleep(self.warmup).await;
        }

        let mut targets = self.extra_targets.clone();
        for probe in &self.probes {
            let address = env.endpoint(&probe.process, &probe.port).await?;
            targets.push(Target::new(&probe.process, address, &probe.path)?);
        }
        if targets.is_empty() {
            return Err(Error::Other("no probe targets configured".to_string()));
        }

        let client = ProbeClient::new(self.client_config.clone())?;
        let handle = ProbeLoop::new(client, self.loop_config.clone()).spawn(targets);
        transition(state, HarnessState::Running);

        let held = self.hold_until_stop(monitoring.as_ref()).await;
        transition(state, HarnessState::Stopping);

        // The handle is stopped and joined before any hold error surfaces,
        // so no probe task can outlive the run.
        let stats = handle.stop().await;
        held?;

        Ok(BenchReport { stats: stats? })
    }

    async fn hold_until_stop(&self, monitoring: Option<&Monitoring>) -> Result<()> {
        if let Some(monitoring) = monitoring
            && !self.graphs.is_empty()
        {
            monitoring.open_dashboard(&self.graphs)?;
        }

        match &self.stop {
            StopCondition::Interactive => interactive::run_until_endpoint_hit().await,
            StopCondition::After(duration) => {
                info!(run_for = ?duration, "running for a fixed duration");
                sleep(*duration).await;
                Ok(())
            }
        }
    }

    fn derived_scrape_jobs(&self, env: &Environment) -> Vec<ScrapeJob> {
        self.probes
            .iter()
            .filter_map(|probe| {
                let port = self
                    .processes
                    .iter()
                    .find(|spec| spec.name() == probe.process)?
                    .port(&probe.port)?;
                Some(
                    ScrapeJob::new(
                        probe.process.clone(),
                        format!("{}:{}", env.container_name(&probe.process), port),
                    )
                    .metrics_path(probe.path.clone())
                    .scheme(self.client_config.scheme)
                    .insecure_skip_verify(self.client_config.accept_invalid_certs),
                )
            })
            .collect()
    }
}

fn transition(state: &mut HarnessState, next: HarnessState) {
    info!(from = ?state, to = ?next, "harness state");
    *state = next;
}

#[derive(Debug)]
pub struct BenchReport {
    pub stats: Vec<ProbeStats>,
}

impl BenchReport {
    pub fn summary(&self) -> String {
        let mut out = String::from("Benchmark results:\n");
        for stats in &self.stats {
            let _ = writeln!(
                out,
                " - {}: {} probes, {} bytes total, avg latency {:?}, max latency {:?}",
                stats.target,
                stats.probes,
                stats.bytes_total,
                stats.avg_latency(),
                stats.latency_max,
            );
        }
        out
    }
}
