use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::lease::LeaseError;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("compose file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Lease(#[from] LeaseError),

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The command ran and exited non-zero. `output` is stdout and stderr.
    #[error("{command} failed ({status}): {output}")]
    Command {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("could not read compose file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not parse compose file {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("could not decode port mappings for service {service}: {source}")]
    Inspect {
        service: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not find port mappings for service {service} ({port})")]
    NoPortMappings { service: String, port: String },
}
