pub mod agent;

use std::collections::HashMap;
use std::time::Duration;

use testcontainers::core::{AccessMode, ContainerPort, Mount, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tracing::{info, warn};

use crate::error::{Error, Result};

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// A host directory bind-mounted into a process's container.
#[derive(Debug, Clone)]
pub struct BindVolume {
    pub host: String,
    pub container: String,
    pub read_only: bool,
}

impl BindVolume {
    pub fn new(host: impl Into<String>, container: impl Into<String>, read_only: bool) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only,
        }
    }
}

#[derive(Debug, Clone)]
struct ContainerFile {
    path: String,
    content: Vec<u8>,
}

/// Everything needed to run one dependent process: image, command line,
/// privilege flag, bind mounts, named ports, and a readiness condition.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    name: String,
    image: String,
    tag: String,
    command: Vec<String>,
    privileged: bool,
    volumes: Vec<BindVolume>,
    ports: HashMap<String, u16>,
    ready: WaitFor,
    startup_timeout: Duration,
    files: Vec<ContainerFile>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            tag: tag.into(),
            command: Vec::new(),
            privileged: false,
            volumes: Vec::new(),
            ports: HashMap::new(),
            ready: WaitFor::seconds(5),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            files: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn port(&self, name: &str) -> Option<u16> {
        self.ports.get(name).copied()
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.push(arg.into());
        self
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.command.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    #[must_use]
    pub fn volume(mut self, volume: BindVolume) -> Self {
        self.volumes.push(volume);
        self
    }

    #[must_use]
    pub fn with_port(mut self, name: impl Into<String>, port: u16) -> Self {
        self.ports.insert(name.into(), port);
        self
    }

    #[must_use]
    pub fn ready_when(mut self, ready: WaitFor) -> Self {
        self.ready = ready;
        self
    }

    #[must_use]
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.push(ContainerFile {
            path: path.into(),
            content: content.into(),
        });
        self
    }
}

struct StartedProcess {
    container: ContainerAsync<GenericImage>,
    container_name: String,
    ports: HashMap<String, u16>,
}

/// A named, isolated runtime environment. Every process started in it joins
/// a docker network named after the environment and gets the deterministic
/// container name `<env>-<process>`, which is what monitoring queries key on.
pub struct Environment {
    name: String,
    processes: HashMap<String, StartedProcess>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processes: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container_name(&self, process: &str) -> String {
        format!("{}-{}", self.name, process)
    }

    /// Starts the process and blocks until its readiness condition holds.
    /// All-or-nothing: a non-ready process within the startup timeout is a
    /// hard failure.
    pub async fn start_and_wait_ready(&mut self, spec: ProcessSpec) -> Result<()> {
        let container_name = self.container_name(&spec.name);

        let mut image =
            GenericImage::new(spec.image.clone(), spec.tag.clone()).with_wait_for(spec.ready.clone());
        for port in spec.ports.values() {
            image = image.with_exposed_port(ContainerPort::Tcp(*port));
        }

        let mut request = image
            .with_container_name(&container_name)
            .with_network(&self.name)
            .with_startup_timeout(spec.startup_timeout);

        if !spec.command.is_empty() {
            request = request.with_cmd(spec.command.clone());
        }
        if spec.privileged {
            request = request.with_privileged(true);
        }
        for volume in &spec.volumes {
            let mut mount = Mount::bind_mount(volume.host.clone(), volume.container.clone());
            if volume.read_only {
                mount = mount.with_access_mode(AccessMode::ReadOnly);
            }
            request = request.with_mount(mount);
        }
        for file in &spec.files {
            request = request.with_copy_to(file.path.clone(), file.content.clone());
        }

        let container = request.start().await?;
        info!(process = %spec.name, container = %container_name, "process started and ready");

        self.processes.insert(
            spec.name,
            StartedProcess {
                container,
                container_name,
                ports: spec.ports,
            },
        );

        Ok(())
    }

    /// The externally reachable `host:port` for a named port, as seen from
    /// the host running the harness.
    pub async fn endpoint(&self, process: &str, port: &str) -> Result<String> {
        let (started, container_port) = self.lookup(process, port)?;
        let host = started.container.get_host().await?;
        let mapped = started
            .container
            .get_host_port_ipv4(ContainerPort::Tcp(container_port))
            .await?;
        Ok(format!("{host}:{mapped}"))
    }

    /// The `name:port` address reachable from other processes inside the
    /// environment's network. Resolvable by docker DNS, so other containers
    /// (e.g. Prometheus) can scrape it directly.
    pub fn internal_endpoint(&self, process: &str, port: &str) -> Result<String> {
        let (started, container_port) = self.lookup(process, port)?;
        Ok(format!("{}:{}", started.container_name, container_port))
    }

    fn lookup(&self, process: &str, port: &str) -> Result<(&StartedProcess, u16)> {
        let started = self
            .processes
            .get(process)
            .ok_or_else(|| Error::UnknownProcess(process.to_string()))?;
        let container_port = started
            .ports
            .get(port)
            .copied()
            .ok_or_else(|| Error::UnknownPort {
                process: process.to_string(),
                port: port.to_string(),
            })?;
        Ok((started, container_port))
    }

    /// Stops and removes every container. Idempotent: a second call is a
    /// no-op. Best-effort across containers; the first error is reported
    /// after all of them were attempted.
    pub async fn close(&mut self) -> Result<()> {
        let processes: Vec<StartedProcess> =
            self.processes.drain().map(|(_, started)| started).collect();
        if processes.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for started in processes {
            if let Err(e) = started.container.stop().await {
                warn!(container = %started.container_name, error = %e, "failed to stop container");
                if first_error.is_none() {
                    first_error = Some(Error::TestContainers(e));
                }
                continue;
            }
            if let Err(e) = started.container.rm().await {
                warn!(container = %started.container_name, error = %e, "failed to remove container");
                if first_error.is_none() {
                    first_error = Some(Error::TestContainers(e));
                }
            }
        }

        info!(environment = %self.name, "environment closed");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
