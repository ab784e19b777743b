use crate::error::{self, Result};
use crate::{ClusterStatus, HighAvailabilityMode, HostStatus, ImageType, NodeRole, Platform};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;

/// A cluster as returned by the assisted service. The service owns this object; every read is a
/// fresh fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: ClusterStatus,
    #[serde(default)]
    pub status_info: Option<String>,
    #[serde(default)]
    pub openshift_version: Option<String>,
    #[serde(default)]
    pub base_dns_domain: Option<String>,
    #[serde(default)]
    pub api_vip: Option<String>,
    #[serde(default)]
    pub ingress_vip: Option<String>,
    #[serde(default)]
    pub machine_network_cidr: Option<String>,
    #[serde(default)]
    pub vip_dhcp_allocation: Option<bool>,
    #[serde(default)]
    pub hosts: Vec<Host>,
    /// A JSON document, encoded as a string, keyed by validation section.
    #[serde(default)]
    pub validations_info: Option<String>,
}

impl Cluster {
    /// Find the status of the validation `validation_id` in `section` (e.g. `network`,
    /// `hosts-data`). Returns `None` if the cluster carries no such validation.
    pub fn validation_status(&self, section: &str, validation_id: &str) -> Result<Option<String>> {
        let raw = match &self.validations_info {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(None),
        };
        let validations: BTreeMap<String, Vec<Validation>> =
            serde_json::from_str(raw).context(error::JsonDeserializeSnafu {
                what: "cluster validations",
            })?;
        Ok(validations
            .get(section)
            .and_then(|section| section.iter().find(|v| v.id == validation_id))
            .map(|v| v.status.clone()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Validation {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// A host registered to a cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Host {
    pub id: String,
    #[serde(default)]
    pub requested_hostname: Option<String>,
    #[serde(default)]
    pub status: HostStatus,
    #[serde(default)]
    pub status_info: Option<String>,
    #[serde(default)]
    pub role: NodeRole,
    #[serde(default)]
    pub bootstrap: bool,
    #[serde(default)]
    pub progress: Option<HostProgress>,
    #[serde(default)]
    pub inventory: Option<String>,
}

impl Host {
    /// The requested hostname, or the host id when the host has not reported one yet.
    pub fn name(&self) -> &str {
        self.requested_hostname.as_deref().unwrap_or(&self.id)
    }

    pub fn current_stage(&self) -> Option<&str> {
        self.progress
            .as_ref()
            .and_then(|progress| progress.current_stage.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostProgress {
    #[serde(default)]
    pub current_stage: Option<String>,
    #[serde(default)]
    pub progress_info: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterCreateParams {
    pub name: String,
    pub openshift_version: String,
    pub pull_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    pub base_dns_domain: String,
    pub vip_dhcp_allocation: bool,
    pub cluster_network_cidr: String,
    pub cluster_network_host_prefix: u8,
    pub service_network_cidr: String,
    pub high_availability_mode: HighAvailabilityMode,
    pub user_managed_networking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_ntp_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<PlatformParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformParams {
    #[serde(rename = "type")]
    pub platform_type: Platform,
}

/// A partial cluster update. Only the fields that are `Some` (or non-empty) are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterUpdateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_vip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_vip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine_network_cidr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_dhcp_allocation: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts_roles: Vec<HostRoleUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts_names: Vec<HostNameUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRoleUpdate {
    pub id: String,
    pub role: NodeRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostNameUpdate {
    pub id: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageCreateParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    pub image_type: ImageType,
}

/// An entry of a cluster's event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub host_id: Option<String>,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub event_time: Option<String>,
}
