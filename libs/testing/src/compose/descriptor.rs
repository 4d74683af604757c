//! The subset of a compose file the orchestrator reads.
//!
//! Only `services.<name>.ports` (target and protocol) and
//! `services.<name>.container_name` matter. Published host ports come from
//! `docker inspect`, never from the file, so ephemeral ports work.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use super::error::ComposeError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComposeFile {
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub container_name: Option<String>,

    #[serde(default)]
    pub ports: Vec<PortSpec>,
}

impl Service {
    /// Name to pass to `docker inspect`: `container_name` when set, else the
    /// service name.
    pub fn container<'a>(&'a self, service: &'a str) -> &'a str {
        self.container_name.as_deref().unwrap_or(service)
    }
}

/// A declared container port.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPort")]
pub struct PortSpec {
    pub target: String,
    /// Lower-cased; `tcp` when not declared.
    pub protocol: String,
}

impl PortSpec {
    pub fn tcp(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            protocol: "tcp".to_string(),
        }
    }

    /// `"<target>/<protocol>"`, the key Docker uses in `NetworkSettings.Ports`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.target, self.protocol)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(u64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPort {
    Long {
        target: Scalar,
        #[serde(default)]
        protocol: Option<String>,
    },
    Short(Scalar),
}

impl TryFrom<RawPort> for PortSpec {
    type Error = String;

    fn try_from(raw: RawPort) -> Result<Self, Self::Error> {
        let (target, protocol) = match raw {
            RawPort::Long { target, protocol } => (target.into_string(), protocol),
            RawPort::Short(Scalar::Number(n)) => (n.to_string(), None),
            RawPort::Short(Scalar::Text(s)) => parse_short(&s)?,
        };

        let target = target.trim().to_string();
        if target.is_empty() {
            return Err("port target is empty".to_string());
        }

        let protocol = protocol
            .map(|p| p.trim().to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "tcp".to_string());

        Ok(Self { target, protocol })
    }
}

/// `[host-ip:][host-port:]container-port[/protocol]`.
fn parse_short(raw: &str) -> Result<(String, Option<String>), String> {
    let (ports, protocol) = match raw.split_once('/') {
        Some((ports, protocol)) => (ports, Some(protocol.to_string())),
        None => (raw, None),
    };

    let target = ports.rsplit(':').next().unwrap_or_default();
    if target.is_empty() {
        return Err(format!("invalid port '{raw}'"));
    }
    Ok((target.to_string(), protocol))
}

impl ComposeFile {
    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn from_path(path: &Path) -> Result<Self, ComposeError> {
        let content = std::fs::read_to_string(path).map_err(|source| ComposeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ComposeError::Descriptor {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Requested services in name order; all of them when `only` is empty.
    /// Names not present in the file are ignored.
    pub fn selected<'a>(&'a self, only: &[&str]) -> Vec<(&'a str, &'a Service)> {
        self.services
            .iter()
            .filter(|(name, _)| only.is_empty() || only.contains(&name.as_str()))
            .map(|(name, service)| (name.as_str(), service))
            .collect()
    }
}
