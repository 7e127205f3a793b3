pub use crate::container::{BindVolume, Environment, ProcessSpec, agent};
pub use crate::error::{Error, Result};
pub use crate::harness::{BenchHarness, BenchReport, HarnessState, StopCondition};
pub use crate::interactive::{open_in_browser, run_until_endpoint_hit};
pub use crate::monitor::{
    GraphQuery, Monitoring, MonitoringOptions, PrometheusConfig, PrometheusConfigBuilder, ScrapeJob,
};
pub use crate::probe::{
    ProbeClient, ProbeClientConfig, ProbeLoop, ProbeLoopConfig, ProbeResult, ProbeStats, Prober,
    RunHandle, Scheme, Target,
};
