use std::time::Duration;

use kubelet_bench::monitor::{GraphQuery, PrometheusConfig, ScrapeJob, dashboard_query};
use kubelet_bench::probe::Scheme;

#[test]
fn prometheus_config_renders_scrape_jobs() {
    let yaml = PrometheusConfig::builder()
        .scrape_interval(Duration::from_secs(1))
        .job(ScrapeJob::new("prometheus", "localhost:9090"))
        .job(
            ScrapeJob::new("kubelet", "kubeletbench-kubelet:10250")
                .metrics_path("/metrics/cadvisor")
                .scheme(Scheme::Https)
                .insecure_skip_verify(true),
        )
        .build()
        .to_yaml()
        .expect("config must render");

    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("rendered config must parse");
    assert_eq!(value["global"]["scrape_interval"], "1s");

    let jobs = value["scrape_configs"]
        .as_sequence()
        .expect("scrape_configs must be a sequence");
    assert_eq!(jobs.len(), 2);

    assert_eq!(jobs[0]["job_name"], "prometheus");
    assert_eq!(jobs[0]["scheme"], "http");
    assert!(jobs[0].get("tls_config").is_none());

    assert_eq!(jobs[1]["scheme"], "https");
    assert_eq!(jobs[1]["metrics_path"], "/metrics/cadvisor");
    assert_eq!(jobs[1]["tls_config"]["insecure_skip_verify"], true);
    assert_eq!(
        jobs[1]["static_configs"][0]["targets"][0],
        "kubeletbench-kubelet:10250"
    );
}

#[test]
fn sub_second_scrape_intervals_render_in_milliseconds() {
    let yaml = PrometheusConfig::builder()
        .scrape_interval(Duration::from_millis(500))
        .build()
        .to_yaml()
        .expect("config must render");
    let value: serde_yaml::Value = serde_yaml::from_str(&yaml).expect("rendered config must parse");
    assert_eq!(value["global"]["scrape_interval"], "500ms");
}

#[test]
fn dashboard_query_percent_encodes_expressions() {
    let query = dashboard_query(&[
        GraphQuery::new(r#"rate(container_cpu_usage_seconds_total{name="kubeletbench-kubelet"}[1m])"#),
        GraphQuery::new(r#"container_memory_working_set_bytes{name="kubeletbench-kubelet"}"#)
            .stacked(),
    ]);

    assert!(query.contains(
        "g0.expr=rate%28container_cpu_usage_seconds_total%7Bname%3D%22kubeletbench-kubelet%22%7D%5B1m%5D%29"
    ));
    assert!(query.contains("g0.tab=0"));
    assert!(query.contains("g0.stacked=0"));
    assert!(query.contains("g0.range_input=1h"));
    assert!(query.contains(
        "&g1.expr=container_memory_working_set_bytes%7Bname%3D%22kubeletbench-kubelet%22%7D"
    ));
    assert!(query.contains("g1.stacked=1"));
}
