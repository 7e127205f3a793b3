use super::{BindVolume, ProcessSpec};

pub const AGENT_IMAGE: &str = "kubelet";
pub const AGENT_TAG: &str = "latest";
pub const AGENT_HTTPS_PORT: u16 = 10250;
pub const AGENT_PORT_NAME: &str = "https";

pub const CRI_SHIM_IMAGE: &str = "quay.io/bwplotka/cri-dockerd";
pub const CRI_SHIM_TAG: &str = "v0.2.0";

/// Path serving the container metrics gathered by the agent's embedded
/// cadvisor; a response is typically around 1 MB on a busy node.
pub const CADVISOR_METRICS_PATH: &str = "/metrics/cadvisor";
/// Path serving the agent's own process metrics.
pub const SELF_METRICS_PATH: &str = "/metrics";

/// CRI shim that lets the agent drive the host's docker daemon. The agent
/// dropped native docker support, so this extra process has to run first.
pub fn cri_shim() -> ProcessSpec {
    ProcessSpec::new("cri-dockerd", CRI_SHIM_IMAGE, CRI_SHIM_TAG)
        .arg("--docker-endpoint=unix:///var/run/docker.sock")
        .privileged()
        .volume(BindVolume::new("/var/run", "/var/run", false))
        .volume(BindVolume::new("/var/lib/docker/", "/var/lib/docker", false))
}

/// The node agent under test. Requires a locally built `kubelet:latest`
/// image, so different agent versions can be benchmarked from source.
///
/// The setup is deliberately minimal. It cannot schedule real pods; what
/// matters is that the embedded cadvisor runs and gathers the host cgroups,
/// so the metrics endpoint serves a realistic payload.
pub fn kubelet() -> ProcessSpec {
    ProcessSpec::new("kubelet", AGENT_IMAGE, AGENT_TAG)
        .arg("--fail-swap-on=false")
        .arg("--container-runtime-endpoint=unix:///var/run/cri-dockerd.sock")
        .privileged()
        .volume(BindVolume::new("/sys", "/sys", true))
        .volume(BindVolume::new("/var/run", "/var/run", true))
        // The agent still stats /var/lib/docker for filesystem info even
        // when running against a CRI socket.
        .volume(BindVolume::new("/var/lib/docker/", "/var/lib/docker", true))
        .with_port(AGENT_PORT_NAME, AGENT_HTTPS_PORT)
}
