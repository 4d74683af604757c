//! docker compose orchestration for integration tests.
//!
//! [`Compose::up`] starts services, resolves the host ports Docker published
//! for every declared container port and blocks until each container reports
//! healthy. All operations run under a [`Lease`] so concurrent test binaries
//! never race on the same compose project.

pub mod descriptor;
mod error;
pub mod inspect;

pub use descriptor::{ComposeFile, PortSpec, Service};
pub use error::ComposeError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, info_span, Instrument, Span};

use crate::lease::Lease;
use inspect::{decode_bindings, is_ready, port_template, select_binding, HEALTH_TEMPLATE};

/// Overrides the container CLI (for example `podman`).
pub const PROGRAM_ENV: &str = "COMPOSE_PROGRAM";

const DEFAULT_PROGRAM: &str = "docker";
const HEALTH_TIMEOUT: Duration = Duration::from_secs(20);
const HEALTH_INTERVAL: Duration = Duration::from_secs(1);
const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// A started service and its published ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    /// Declared container port (`"5432"`) to host port.
    pub host_ports: BTreeMap<String, String>,
}

impl Container {
    pub fn host_port(&self, target: &str) -> Option<&str> {
        self.host_ports.get(target).map(String::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct Compose {
    file: PathBuf,
    program: String,
    program_args: Vec<String>,
    lease: Lease,
    span: Span,
    health_timeout: Duration,
    health_interval: Duration,
    settle_delay: Duration,
}

impl Compose {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let file = file.into();
        let program = std::env::var(PROGRAM_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string());
        let span = info_span!("compose", file = %file.display());

        Self {
            file,
            program,
            program_args: Vec::new(),
            lease: Lease::default(),
            span,
            health_timeout: HEALTH_TIMEOUT,
            health_interval: HEALTH_INTERVAL,
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments placed before every command, e.g. a wrapper script path.
    pub fn with_program_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_lease(mut self, lease: Lease) -> Self {
        self.lease = lease;
        self
    }

    /// Span every log line of this orchestrator is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration, interval: Duration) -> Self {
        self.health_timeout = timeout;
        self.health_interval = interval;
        self
    }

    /// Pause after `down` so ports and volumes are released.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Start `services` (all when empty) and return them keyed by service name.
    ///
    /// # Panics
    ///
    /// When a container is not healthy within the health timeout.
    pub async fn up(&self, services: &[&str]) -> Result<BTreeMap<String, Container>, ComposeError> {
        async {
            let _lease = self.lease.acquire().await?;

            if !self.file.is_file() {
                return Err(ComposeError::FileNotFound(self.file.clone()));
            }

            info!(?services, "Starting compose services");
            self.compose("up", &["-d"], services).await?;

            let descriptor = ComposeFile::from_path(&self.file)?;
            let mut containers = BTreeMap::new();

            for (name, service) in descriptor.selected(services) {
                let container = service.container(name);
                let mut host_ports = BTreeMap::new();

                for port in &service.ports {
                    let template = port_template(port);
                    let output = self.run(&["inspect", "-f", &template, container]).await?;
                    let bindings = decode_bindings(name, &stdout(&output))?;
                    let binding =
                        select_binding(bindings).ok_or_else(|| ComposeError::NoPortMappings {
                            service: name.to_string(),
                            port: port.key(),
                        })?;

                    debug!(
                        service = name,
                        port = %port.key(),
                        host_ip = %binding.host_ip,
                        host_port = %binding.host_port,
                        "Resolved port mapping"
                    );
                    host_ports.insert(port.target.clone(), binding.host_port);
                }

                self.wait_healthy(container).await;
                containers.insert(
                    name.to_string(),
                    Container {
                        name: name.to_string(),
                        host_ports,
                    },
                );
            }

            Ok(containers)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Stop `services` (all when empty), then wait out the settle delay.
    pub async fn down(&self, services: &[&str]) -> Result<(), ComposeError> {
        async {
            let _lease = self.lease.acquire().await?;

            info!(?services, "Stopping compose services");
            self.compose("down", &[], services).await?;

            debug!(delay = ?self.settle_delay, "Waiting for services to settle");
            tokio::time::sleep(self.settle_delay).await;
            Ok(())
        }
        .instrument(self.span.clone())
        .await
    }

    async fn compose(
        &self,
        action: &str,
        flags: &[&str],
        services: &[&str],
    ) -> Result<Output, ComposeError> {
        let file = self.file.to_string_lossy();
        let mut args = vec!["compose", "-f", file.as_ref(), action];
        args.extend_from_slice(flags);
        args.extend_from_slice(services);
        self.run(&args).await
    }

    async fn wait_healthy(&self, container: &str) {
        info!(container, "Checking if container is healthy");
        let deadline = Instant::now() + self.health_timeout;

        loop {
            match self.run(&["inspect", "--format", HEALTH_TEMPLATE, container]).await {
                Ok(output) => {
                    let status = stdout(&output);
                    if is_ready(&status) {
                        info!(container, status = %status.trim(), "Container is healthy");
                        return;
                    }
                    debug!(container, status = %status.trim(), "Container not ready");
                }
                Err(e) => debug!(container, error = %e, "Health inspection failed"),
            }

            if Instant::now() >= deadline {
                panic!(
                    "container {container} did not become healthy within {:?}",
                    self.health_timeout
                );
            }
            tokio::time::sleep(self.health_interval).await;
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, ComposeError> {
        let output = Command::new(&self.program)
            .args(&self.program_args)
            .args(args)
            .output()
            .await
            .map_err(|source| ComposeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let mut combined = stdout(&output);
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ComposeError::Command {
                command: format!("{} {}", self.program, args.join(" ")),
                status: output.status,
                output: combined.trim().to_string(),
            });
        }

        Ok(output)
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
