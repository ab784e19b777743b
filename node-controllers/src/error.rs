use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to create '{}' process: {}", what, source))]
    Process {
        what: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "'{}' exited with {}\nstdout: {}\nstderr: {}",
        command,
        status,
        stdout,
        stderr
    ))]
    CommandFailed {
        command: String,
        status: String,
        stdout: String,
        stderr: String,
    },

    #[snafu(display("Unable to access '{}': {}", path.display(), source))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to deserialize {}: {}", what, source))]
    DeserializeJson {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Unable to serialize {}: {}", what, source))]
    SerializeJson {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("Invalid configuration: {}", source))]
    Configuration { source: assisted_test_model::Error },

    #[snafu(display("Invalid machine network '{}': {}", cidr, source))]
    InvalidCidr {
        cidr: String,
        source: ipnetwork::IpNetworkError,
    },

    #[snafu(display("Machine network '{}' has no address at offset {}", cidr, offset))]
    VipOutOfRange { cidr: String, offset: u32 },

    #[snafu(display("No node named '{}'", name))]
    NodeNotFound { name: String },

    #[snafu(display("Node '{}' has no disk at index {}", name, index))]
    DiskNotFound { name: String, index: usize },

    #[snafu(display("Node '{}' has no free disk target", name))]
    NoFreeDiskTarget { name: String },

    #[snafu(display("Missing '{}' in the state of node '{}'", attribute, name))]
    MissingAttribute { name: String, attribute: String },

    #[snafu(display("'{}' of node '{}' is out of range: {}", attribute, name, source))]
    AttributeOutOfRange {
        name: String,
        attribute: String,
        source: std::num::TryFromIntError,
    },

    #[snafu(display("Unable to determine the default route interface from '{}'", output))]
    DefaultInterface { output: String },

    #[snafu(display("{}", source))]
    Wait {
        source: assisted_test_model::waiting::Error,
    },
}
