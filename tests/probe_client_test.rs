mod common;

use std::time::Duration;

use kubelet_bench::Error;
use kubelet_bench::probe::Target;
use rstest::rstest;

use common::MockAgent;

#[tokio::test]
async fn probe_reports_body_size_and_latency() {
    common::init_tracing();
    let agent = MockAgent::start().await;
    let target = Target::new("agent", agent.address(), "/metrics/cadvisor")
        .expect("invalid target");

    let result = common::http_probe_client()
        .probe(&target)
        .await
        .expect("probe failed");

    assert_eq!(result.body_bytes, common::SAMPLE_METRICS.len());
    assert!(result.elapsed > Duration::ZERO);
    assert_eq!(agent.hits(), 1);

    agent.shutdown().await;
}

#[tokio::test]
async fn non_200_status_is_a_hard_failure() {
    let agent = MockAgent::with_status(|_| 500).await;
    let target = Target::new("agent", agent.address(), "/metrics").expect("invalid target");

    let err = common::http_probe_client()
        .probe(&target)
        .await
        .expect_err("a 500 response must fail the probe");

    match err {
        Error::UnexpectedStatus { target, status, .. } => {
            assert_eq!(target, "agent");
            assert_eq!(status, 500);
        }
        other => panic!("expected UnexpectedStatus, got: {other}"),
    }

    agent.shutdown().await;
}

#[tokio::test]
async fn unreachable_target_is_a_transport_error() {
    // Bind and immediately drop a listener so the port is known-dead.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
        listener.local_addr().expect("no local addr").port()
    };
    let target =
        Target::new("agent", format!("127.0.0.1:{port}"), "/metrics").expect("invalid target");

    let err = common::http_probe_client()
        .probe(&target)
        .await
        .expect_err("a dead port must fail the probe");

    assert!(matches!(err, Error::Transport { .. }), "got: {err}");
}

#[rstest]
#[case("", "127.0.0.1:10250", "/metrics")]
#[case("agent", "", "/metrics")]
#[case("agent", "127.0.0.1:10250", "metrics")]
#[case("agent", "127.0.0.1:10250", "")]
fn invalid_targets_are_rejected(#[case] name: &str, #[case] address: &str, #[case] path: &str) {
    assert!(matches!(
        Target::new(name, address, path),
        Err(Error::InvalidTarget(_))
    ));
}
