#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use kubelet_bench::probe::{ProbeClient, ProbeClientConfig, Scheme};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SAMPLE_METRICS: &str = "\
# HELP container_cpu_usage_seconds_total Cumulative cpu time consumed in seconds.\n\
# TYPE container_cpu_usage_seconds_total counter\n\
container_cpu_usage_seconds_total{name=\"kubeletbench-kubelet\"} 42.5\n\
# HELP container_memory_working_set_bytes Current working set in bytes.\n\
# TYPE container_memory_working_set_bytes gauge\n\
container_memory_working_set_bytes{name=\"kubeletbench-kubelet\"} 932996\n";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn http_probe_client() -> ProbeClient {
    ProbeClient::new(ProbeClientConfig {
        scheme: Scheme::Http,
        accept_invalid_certs: false,
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(1),
    })
    .expect("failed to build probe client")
}

/// In-process stand-in for the agent's metrics endpoint: serves a canned
/// exposition payload, counts requests, and can be scripted to return a
/// given status per request index.
pub struct MockAgent {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MockAgent {
    pub async fn start() -> Self {
        Self::with_status(|_| 200).await
    }

    pub async fn with_status(status: impl Fn(usize) -> u16 + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock agent");
        let addr = listener.local_addr().expect("mock agent has no address");
        let hits = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();

        let task = {
            let hits = Arc::clone(&hits);
            let token = token.clone();
            tokio::spawn(async move {
                loop {
                    let accepted = tokio::select! {
                        _ = token.cancelled() => break,
                        accepted = listener.accept() => accepted,
                    };
                    let Ok((mut stream, _)) = accepted else { break };

                    let request_index = hits.fetch_add(1, Ordering::SeqCst);
                    let code = status(request_index);

                    let mut buf = [0u8; 1024];
                    let _ = stream.read(&mut buf).await;

                    let reason = match code {
                        200 => "OK",
                        500 => "Internal Server Error",
                        _ => "Error",
                    };
                    let response = format!(
                        "HTTP/1.1 {code} {reason}\r\n\
                         content-type: text/plain; version=0.0.4\r\n\
                         content-length: {}\r\n\
                         connection: close\r\n\r\n{}",
                        SAMPLE_METRICS.len(),
                        SAMPLE_METRICS,
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                }
            })
        };

        Self {
            addr,
            hits,
            token,
            task,
        }
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.addr.port())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}
