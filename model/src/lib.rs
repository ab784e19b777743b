/*!

This library provides the data model of the assisted installer service as the test harness sees
it: cluster and host statuses, the REST client, the harness configuration, the Kubernetes pull
secret helper, and the waits that poll the service until a cluster or its hosts reach a status.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use cluster::{
    Cluster, ClusterCreateParams, ClusterUpdateParams, Event, Host, HostNameUpdate, HostProgress,
    HostRoleUpdate, ImageCreateParams, PlatformParams, Validation,
};
pub use configuration::{ClusterConfig, Configuration, EnvConfig, NodesConfig, VSphereConfig};
pub use error::{Error, Result};
pub use report::ClusterReport;
pub use status::{
    ClusterStatus, HighAvailabilityMode, HostStatus, ImageType, NodeRole, ObservedStatus, Platform,
};
pub use waiting::WaitSettings;

pub mod clients;
mod cluster;
mod configuration;
pub mod constants;
mod error;
mod report;
pub mod secret;
mod status;
pub mod waiting;
