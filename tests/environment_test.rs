mod common;

use kubelet_bench::Error;
use kubelet_bench::container::{Environment, ProcessSpec};
use kubelet_bench::probe::Target;
use testcontainers::core::wait::HttpWaitStrategy;
use testcontainers::core::{ContainerPort, WaitFor};

#[tokio::test]
async fn close_is_idempotent() {
    let mut env = Environment::new("benchidle");
    env.close().await.expect("first close must succeed");
    env.close().await.expect("second close must be a no-op");
}

#[tokio::test]
async fn unknown_process_is_reported() {
    let env = Environment::new("benchidle");
    assert!(matches!(
        env.endpoint("ghost", "http").await,
        Err(Error::UnknownProcess(_))
    ));
    assert!(matches!(
        env.internal_endpoint("ghost", "http"),
        Err(Error::UnknownProcess(_))
    ));
}

#[tokio::test]
#[ignore = "requires a local docker daemon"]
async fn starts_a_process_and_resolves_its_endpoints() {
    common::init_tracing();
    let mut env = Environment::new("benchsmoke");

    let spec = ProcessSpec::new("prometheus", "prom/prometheus", "v2.53.0")
        .with_port("http", 9090)
        .ready_when(WaitFor::http(
            HttpWaitStrategy::new("/-/ready")
                .with_port(ContainerPort::Tcp(9090))
                .with_expected_status_code(200_u16),
        ));
    env.start_and_wait_ready(spec)
        .await
        .expect("failed to start prometheus");

    let internal = env
        .internal_endpoint("prometheus", "http")
        .expect("internal endpoint must resolve");
    assert_eq!(internal, "benchsmoke-prometheus:9090");

    assert!(matches!(
        env.endpoint("prometheus", "grpc").await,
        Err(Error::UnknownPort { .. })
    ));

    let address = env
        .endpoint("prometheus", "http")
        .await
        .expect("endpoint must resolve");
    let target = Target::new("prometheus", address, "/-/ready").expect("invalid target");
    let result = common::http_probe_client()
        .probe(&target)
        .await
        .expect("probe against a ready process must succeed");
    assert!(result.body_bytes > 0);

    env.close().await.expect("close must succeed");
}
