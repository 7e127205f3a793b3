pub mod prometheus;

use std::fmt::Write as _;
use std::time::Duration;

use testcontainers::core::wait::HttpWaitStrategy;
use testcontainers::core::{ContainerPort, WaitFor};
use tracing::info;

use crate::container::{BindVolume, Environment, ProcessSpec};
use crate::error::Result;
use crate::interactive;

pub use prometheus::{PrometheusConfig, PrometheusConfigBuilder, ScrapeJob};

use prometheus::{
    CADVISOR_IMAGE, CADVISOR_PORT, CADVISOR_TAG, PROMETHEUS_CONFIG_PATH, PROMETHEUS_IMAGE,
    PROMETHEUS_TAG, PROMETHEUS_UI_PORT,
};

#[derive(Debug, Clone)]
pub struct MonitoringOptions {
    scrape_interval: Duration,
    prometheus_tag: String,
    with_cadvisor: bool,
    jobs: Vec<ScrapeJob>,
}

impl Default for MonitoringOptions {
    fn default() -> Self {
        Self {
            scrape_interval: Duration::from_secs(5),
            prometheus_tag: PROMETHEUS_TAG.to_string(),
            with_cadvisor: true,
            jobs: Vec::new(),
        }
    }
}

impl MonitoringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scrape_interval(mut self, interval: Duration) -> Self {
        self.scrape_interval = interval;
        self
    }

    #[must_use]
    pub fn prometheus_tag(mut self, tag: impl Into<String>) -> Self {
        self.prometheus_tag = tag.into();
        self
    }

    #[must_use]
    pub fn without_cadvisor(mut self) -> Self {
        self.with_cadvisor = false;
        self
    }

    #[must_use]
    pub fn job(mut self, job: ScrapeJob) -> Self {
        self.jobs.push(job);
        self
    }
}

/// One graph panel on the Prometheus dashboard.
#[derive(Debug, Clone)]
pub struct GraphQuery {
    expr: String,
    range: String,
    stacked: bool,
}

impl GraphQuery {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            range: "1h".to_string(),
            stacked: false,
        }
    }

    #[must_use]
    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }

    #[must_use]
    pub fn stacked(mut self) -> Self {
        self.stacked = true;
        self
    }
}

/// Prometheus + cAdvisor attached to an environment. Prometheus scrapes
/// itself, cAdvisor, and every configured job; the dashboard shows the
/// probed agent's resource consumption over the run.
pub struct Monitoring {
    ui_endpoint: String,
}

impl Monitoring {
    pub async fn start(env: &mut Environment, options: MonitoringOptions) -> Result<Self> {
        let mut config = PrometheusConfig::builder()
            .scrape_interval(options.scrape_interval)
            .job(ScrapeJob::new(
                "prometheus",
                format!("localhost:{PROMETHEUS_UI_PORT}"),
            ));

        if options.with_cadvisor {
            env.start_and_wait_ready(cadvisor_spec()).await?;
            config = config.job(ScrapeJob::new(
                "cadvisor",
                format!("{}:{}", env.container_name("cadvisor"), CADVISOR_PORT),
            ));
        }
        for job in options.jobs {
            config = config.job(job);
        }

        let config_yaml = config.build().to_yaml()?;
        env.start_and_wait_ready(prometheus_spec(&options.prometheus_tag, config_yaml))
            .await?;

        let ui_endpoint = env.endpoint("prometheus", "http").await?;
        info!(ui = %format!("http://{ui_endpoint}"), "monitoring started");

        Ok(Self { ui_endpoint })
    }

    pub fn ui_url(&self) -> String {
        format!("http://{}", self.ui_endpoint)
    }

    pub fn dashboard_url(&self, graphs: &[GraphQuery]) -> String {
        if graphs.is_empty() {
            return format!("{}/graph", self.ui_url());
        }
        format!("{}/graph?{}", self.ui_url(), dashboard_query(graphs))
    }

    pub fn open_dashboard(&self, graphs: &[GraphQuery]) -> Result<()> {
        interactive::open_in_browser(&self.dashboard_url(graphs))
    }
}

/// Renders the `g0.expr=…&g0.tab=0&…` query string the Prometheus graph
/// page expects, one panel per query.
pub fn dashboard_query(graphs: &[GraphQuery]) -> String {
    let mut query = String::new();
    for (i, graph) in graphs.iter().enumerate() {
        let _ = write!(
            query,
            "{}g{i}.expr={}&g{i}.tab=0&g{i}.stacked={}&g{i}.range_input={}",
            if i == 0 { "" } else { "&" },
            encode_query_value(&graph.expr),
            u8::from(graph.stacked),
            encode_query_value(&graph.range),
        );
    }
    query
}

fn cadvisor_spec() -> ProcessSpec {
    ProcessSpec::new("cadvisor", CADVISOR_IMAGE, CADVISOR_TAG)
        .privileged()
        .volume(BindVolume::new("/", "/rootfs", true))
        .volume(BindVolume::new("/var/run", "/var/run", false))
        .volume(BindVolume::new("/sys", "/sys", true))
        .volume(BindVolume::new("/var/lib/docker/", "/var/lib/docker", true))
        .with_port("http", CADVISOR_PORT)
        .ready_when(WaitFor::http(
            HttpWaitStrategy::new("/healthz")
                .with_port(ContainerPort::Tcp(CADVISOR_PORT))
                .with_expected_status_code(200_u16),
        ))
}

fn prometheus_spec(tag: &str, config_yaml: String) -> ProcessSpec {
    ProcessSpec::new("prometheus", PROMETHEUS_IMAGE, tag)
        .with_port("http", PROMETHEUS_UI_PORT)
        .with_file(PROMETHEUS_CONFIG_PATH, config_yaml.into_bytes())
        .ready_when(WaitFor::http(
            HttpWaitStrategy::new("/-/ready")
                .with_port(ContainerPort::Tcp(PROMETHEUS_UI_PORT))
                .with_expected_status_code(200_u16),
        ))
}

// Percent-encodes a query-string value, keeping only RFC 3986 unreserved
// characters literal.
fn encode_query_value(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => {
                let _ = write!(encoded, "%{byte:02X}");
            }
        }
    }
    encoded
}
