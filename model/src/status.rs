use crate::error::{self, Error, Result};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

/// A status value reported by the assisted service for a cluster or a host. The service owns the
/// state machines; this harness only compares what it observes.
pub trait ObservedStatus: Clone + Debug + Display + Eq + Hash + Send + Sync + 'static {
    /// Whether the status is the service's `error` state.
    fn is_error(&self) -> bool;

    /// Whether the service sent a value this harness does not recognize. Such a status never
    /// satisfies a wait and never aborts one.
    fn is_unknown(&self) -> bool;
}

/// Implements `FromStr` for a status enum. Deserializing maps unrecognized values to `Unknown`,
/// but a status given by a user must name a real status, so parsing rejects them.
macro_rules! impl_status_from_str {
    ($status:ident, $kind:expr) => {
        impl FromStr for $status {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let status: $status =
                    serde_plain::from_str(s).context(error::StatusParseSnafu {
                        kind: $kind,
                        value: s,
                    })?;
                match status {
                    $status::Unknown => Err(error::UnknownStatusSnafu {
                        kind: $kind,
                        value: s,
                    }
                    .build()
                    .into()),
                    status => Ok(status),
                }
            }
        }
    };
}

/// The statuses of a cluster. Unrecognized values deserialize to `Unknown`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterStatus {
    Insufficient,
    Ready,
    PreparingForInstallation,
    Installing,
    Finalizing,
    Installed,
    Error,
    Cancelled,
    PendingForInput,
    InstallingPendingUserAction,
    #[serde(other)]
    Unknown,
}

impl Default for ClusterStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

serde_plain::derive_display_from_serialize!(ClusterStatus);
impl_status_from_str!(ClusterStatus, "cluster status");

impl ObservedStatus for ClusterStatus {
    fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// The statuses of a host. Unrecognized values deserialize to `Unknown`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostStatus {
    Insufficient,
    Known,
    Installing,
    InstallingInProgress,
    InstallingPendingUserAction,
    Installed,
    Error,
    PendingForInput,
    #[serde(rename = "added-to-existing-cluster")]
    Day2Installed,
    ResettingPendingUserAction,
    Disconnected,
    #[serde(other)]
    Unknown,
}

impl Default for HostStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

serde_plain::derive_display_from_serialize!(HostStatus);
impl_status_from_str!(HostStatus, "host status");

impl ObservedStatus for HostStatus {
    fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeRole {
    Master,
    Worker,
    AutoAssign,
}

impl Default for NodeRole {
    fn default() -> Self {
        Self::AutoAssign
    }
}

serde_plain::derive_display_from_serialize!(NodeRole);
serde_plain::derive_fromstr_from_deserialize!(NodeRole);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImageType {
    FullIso,
    MinimalIso,
}

impl Default for ImageType {
    fn default() -> Self {
        Self::FullIso
    }
}

serde_plain::derive_display_from_serialize!(ImageType);
serde_plain::derive_fromstr_from_deserialize!(ImageType);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Baremetal,
    None,
    Vsphere,
}

impl Default for Platform {
    fn default() -> Self {
        Self::Baremetal
    }
}

serde_plain::derive_display_from_serialize!(Platform);
serde_plain::derive_fromstr_from_deserialize!(Platform);

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum HighAvailabilityMode {
    Full,
    None,
}

impl Default for HighAvailabilityMode {
    fn default() -> Self {
        Self::Full
    }
}

serde_plain::derive_display_from_serialize!(HighAvailabilityMode);
serde_plain::derive_fromstr_from_deserialize!(HighAvailabilityMode);
