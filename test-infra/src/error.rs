use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to {}: {}", what, source))]
    Client {
        what: String,
        source: assisted_test_model::clients::Error,
    },

    #[snafu(display("{}", source))]
    Wait {
        source: assisted_test_model::waiting::Error,
    },

    #[snafu(display("Unable to {}: {}", what, source))]
    Controller {
        what: String,
        source: node_controllers::Error,
    },

    #[snafu(display("Unable to write '{}': {}", path.display(), source))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to serialize {}: {}", what, source))]
    Serialize {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to connect to '{}': {}", address, source))]
    SshConnect {
        address: String,
        source: openssh::Error,
    },

    #[snafu(display("Unable to run '{}' on '{}': {}", command, address, source))]
    SshCommand {
        command: String,
        address: String,
        source: openssh::Error,
    },

    #[snafu(display("'{}' on '{}' exited with {}", command, address, status))]
    SshStatus {
        command: String,
        address: String,
        status: String,
    },

    #[snafu(display("Node '{}' has no IP address", name))]
    NoNodeIp { name: String },

    #[snafu(display("No node named '{}'", name))]
    NodeNotFound { name: String },

    #[snafu(display("There are no nodes to run '{}' on", scenario))]
    NoNodes { scenario: String },

    #[snafu(display("Cluster {} is not in status '{}'", cluster_id, expected))]
    ClusterNotInStatus { cluster_id: String, expected: String },

    #[snafu(display("Cluster {} has no bootstrap host", cluster_id))]
    NoBootstrap { cluster_id: String },
}

impl Error {
    /// The wait error, when this error is a failed wait.
    pub fn wait_error(&self) -> Option<&assisted_test_model::waiting::Error> {
        match self {
            Error::Wait { source } => Some(source),
            _ => None,
        }
    }
}
