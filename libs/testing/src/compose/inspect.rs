//! `docker inspect` templates and output decoding.

use serde::Deserialize;

use super::descriptor::PortSpec;
use super::error::ComposeError;

/// Prints the health status, or the plain state for containers without a
/// health check.
pub const HEALTH_TEMPLATE: &str =
    "{{if .State.Health}}{{.State.Health.Status}}{{else}}{{.State.Status}}{{end}}";

/// Renders the bindings of one container port as a JSON array.
pub fn port_template(port: &PortSpec) -> String {
    format!(
        "[{{{{range $i,$v := (index .NetworkSettings.Ports \"{}\")}}}}{{{{if $i}}}},{{{{end}}}}{{{{json $v}}}}{{{{end}}}}]",
        port.key()
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortBinding {
    #[serde(rename = "HostIp", default)]
    pub host_ip: String,
    #[serde(rename = "HostPort")]
    pub host_port: String,
}

pub fn decode_bindings(service: &str, raw: &str) -> Result<Vec<PortBinding>, ComposeError> {
    serde_json::from_str(raw.trim()).map_err(|source| ComposeError::Inspect {
        service: service.to_string(),
        source,
    })
}

/// First binding not on the IPv6 wildcard. Podman reports an empty host IP
/// where Docker says `0.0.0.0`; that becomes `localhost`.
pub fn select_binding(bindings: Vec<PortBinding>) -> Option<PortBinding> {
    bindings
        .into_iter()
        .find(|b| b.host_ip != "::")
        .map(|mut b| {
            if b.host_ip.is_empty() {
                b.host_ip = "localhost".to_string();
            }
            b
        })
}

/// `healthy` passes; `running` passes for containers with no health check,
/// since the template only prints the plain state for those.
pub fn is_ready(status: &str) -> bool {
    matches!(status.trim(), "healthy" | "running")
}
