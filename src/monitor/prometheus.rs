use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::probe::Scheme;

pub const PROMETHEUS_IMAGE: &str = "prom/prometheus";
pub const PROMETHEUS_TAG: &str = "v2.53.0";
pub const PROMETHEUS_UI_PORT: u16 = 9090;
pub const PROMETHEUS_CONFIG_PATH: &str = "/etc/prometheus/prometheus.yml";

pub const CADVISOR_IMAGE: &str = "gcr.io/cadvisor/cadvisor";
pub const CADVISOR_TAG: &str = "v0.47.2";
pub const CADVISOR_PORT: u16 = 8080;

/// One scrape job in the generated Prometheus configuration.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    name: String,
    target: String,
    path: String,
    scheme: Scheme,
    insecure_skip_verify: bool,
}

impl ScrapeJob {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            path: "/metrics".to_string(),
            scheme: Scheme::Http,
            insecure_skip_verify: false,
        }
    }

    #[must_use]
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    #[must_use]
    pub fn insecure_skip_verify(mut self, skip: bool) -> Self {
        self.insecure_skip_verify = skip;
        self
    }
}

#[derive(Debug, Default)]
pub struct PrometheusConfigBuilder {
    scrape_interval: Option<Duration>,
    jobs: Vec<ScrapeJob>,
}

impl PrometheusConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scrape_interval(mut self, interval: Duration) -> Self {
        self.scrape_interval = Some(interval);
        self
    }

    #[must_use]
    pub fn job(mut self, job: ScrapeJob) -> Self {
        self.jobs.push(job);
        self
    }

    pub fn build(self) -> PrometheusConfig {
        PrometheusConfig {
            global: GlobalConfig {
                scrape_interval: duration_str(
                    self.scrape_interval.unwrap_or(Duration::from_secs(5)),
                ),
            },
            scrape_configs: self.jobs.into_iter().map(ScrapeConfig::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PrometheusConfig {
    global: GlobalConfig,
    scrape_configs: Vec<ScrapeConfig>,
}

impl PrometheusConfig {
    pub fn builder() -> PrometheusConfigBuilder {
        PrometheusConfigBuilder::new()
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GlobalConfig {
    scrape_interval: String,
}

#[derive(Debug, Serialize)]
struct ScrapeConfig {
    job_name: String,
    metrics_path: String,
    scheme: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls_config: Option<TlsConfig>,
    static_configs: Vec<StaticConfig>,
}

impl From<ScrapeJob> for ScrapeConfig {
    fn from(job: ScrapeJob) -> Self {
        Self {
            job_name: job.name,
            metrics_path: job.path,
            scheme: job.scheme.as_str().to_string(),
            tls_config: job.insecure_skip_verify.then_some(TlsConfig {
                insecure_skip_verify: true,
            }),
            static_configs: vec![StaticConfig {
                targets: vec![job.target],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct TlsConfig {
    insecure_skip_verify: bool,
}

#[derive(Debug, Serialize)]
struct StaticConfig {
    targets: Vec<String>,
}

fn duration_str(d: Duration) -> String {
    if d.as_secs() == 0 || d.subsec_millis() != 0 {
        format!("{}ms", d.as_millis())
    } else {
        format!("{}s", d.as_secs())
    }
}
