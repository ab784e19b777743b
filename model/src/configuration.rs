use crate::cluster::{ClusterCreateParams, PlatformParams};
use crate::constants::{
    CLUSTER_PREFIX, DEFAULT_ADDITIONAL_NTP_SOURCE, DEFAULT_BASE_DNS_DOMAIN, DEFAULT_CLUSTER_CIDR,
    DEFAULT_HOST_PREFIX, DEFAULT_MACHINE_CIDR, DEFAULT_NAMESPACE, DEFAULT_OPENSHIFT_VERSION,
    DEFAULT_SERVICE_CIDR, DEFAULT_SERVICE_URL, DEFAULT_SSH_PRIVATE_KEY_PATH, IMAGE_FOLDER,
    IMAGE_NAME, LOG_FOLDER, MASTER_CPU, NUMBER_OF_MASTERS, STORAGE_PATH, TEST_NETWORK, TF_FOLDER,
    WORKER_CPU,
};
use crate::error::{self, Result};
use crate::{HighAvailabilityMode, ImageType, Platform};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use snafu::ResultExt;
use std::fmt::Debug;
use std::path::PathBuf;

/// The `Configuration` trait is for plain old data structs that are handed to external tools as
/// JSON objects, for example as a Terraform variables file.
pub trait Configuration:
    Serialize + DeserializeOwned + Clone + Debug + Default + Send + Sync + Sized + 'static
{
    /// Convert the `Configuration` object to a serde `Map`.
    fn into_map(self) -> Result<Map<String, Value>> {
        match self.into_value()? {
            Value::Object(map) => Ok(map),
            _ => Err(error::ConfigWrongValueTypeSnafu {}.build().into()),
        }
    }

    /// Convert the `Configuration` object to a serde `Value`.
    fn into_value(self) -> Result<Value> {
        Ok(serde_json::to_value(self).context(error::ConfigSerializationSnafu)?)
    }

    /// Deserialize the `Configuration` object from a serde `Map`.
    fn from_map(map: Map<String, Value>) -> Result<Self> {
        Self::from_value(Value::Object(map))
    }

    /// Deserialize the `Configuration` object from a serde `Value`.
    fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value).context(error::ConfigDeserializationSnafu)?)
    }
}

/// Every setting the harness reads from its environment. Built once with [`EnvConfig::from_env`]
/// and then passed explicitly to whatever needs it; each field documents its variable and default.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvConfig {
    /// `REMOTE_SERVICE_URL`, defaults to `http://localhost:8090`.
    #[serde(default = "default_service_url")]
    pub remote_service_url: String,
    /// `OFFLINE_TOKEN`, sent as a bearer token when present.
    #[serde(default)]
    pub offline_token: Option<String>,
    /// `PULL_SECRET`, defaults to empty.
    #[serde(default)]
    pub pull_secret: String,
    /// `SSH_PUB_KEY`, defaults to empty.
    #[serde(default)]
    pub ssh_pub_key: String,
    /// `PRIVATE_SSH_KEY_PATH`, defaults to `ssh_key/key`.
    #[serde(default = "default_private_ssh_key_path")]
    pub private_ssh_key_path: PathBuf,
    /// `CLUSTER_NAME`, a random `test-infra-cluster-xxxxxxxx` name when absent.
    #[serde(default)]
    pub cluster_name: Option<String>,
    /// `OPENSHIFT_VERSION`, defaults to `4.7`.
    #[serde(default = "default_openshift_version")]
    pub openshift_version: String,
    /// `BASE_DNS_DOMAIN`, defaults to `redhat.com`.
    #[serde(default = "default_base_dns_domain")]
    pub base_dns_domain: String,
    /// `NUM_MASTERS`, defaults to 3.
    #[serde(default = "default_num_masters")]
    pub num_masters: usize,
    /// `NUM_WORKERS`, defaults to 0.
    #[serde(default)]
    pub num_workers: usize,
    /// `MASTER_MEMORY` in MiB, defaults to 16984.
    #[serde(default = "default_master_memory")]
    pub master_memory: u64,
    /// `WORKER_MEMORY` in MiB, defaults to 8892.
    #[serde(default = "default_worker_memory")]
    pub worker_memory: u64,
    /// `MASTER_CPU`, defaults to 4.
    #[serde(default = "default_master_cpu")]
    pub master_cpu: u32,
    /// `WORKER_CPU`, defaults to 2.
    #[serde(default = "default_worker_cpu")]
    pub worker_cpu: u32,
    /// `MASTER_DISK` in bytes, defaults to 20 GiB.
    #[serde(default = "default_disk")]
    pub master_disk: u64,
    /// `WORKER_DISK` in bytes, defaults to 20 GiB.
    #[serde(default = "default_disk")]
    pub worker_disk: u64,
    /// `TF_CPU_MODE`, defaults to `host-passthrough`.
    #[serde(default = "default_cpu_mode")]
    pub tf_cpu_mode: String,
    /// `VIP_DHCP_ALLOCATION`, defaults to true.
    #[serde(default = "default_true")]
    pub vip_dhcp_allocation: bool,
    /// `MACHINE_CIDR`, defaults to `192.168.126.0/24`.
    #[serde(default = "default_machine_cidr")]
    pub machine_cidr: String,
    /// `SERVICE_CIDR`, defaults to `172.30.0.0/16`.
    #[serde(default = "default_service_cidr")]
    pub service_cidr: String,
    /// `CLUSTER_CIDR`, defaults to `10.128.0.0/14`.
    #[serde(default = "default_cluster_cidr")]
    pub cluster_cidr: String,
    /// `HOST_PREFIX`, defaults to 23.
    #[serde(default = "default_host_prefix")]
    pub host_prefix: u8,
    /// `NETWORK_NAME`, defaults to `test-infra-net-`.
    #[serde(default = "default_network_name")]
    pub network_name: String,
    /// `NETWORK_IF`, the libvirt bridge of the primary network, defaults to `tt0`.
    #[serde(default = "default_network_if")]
    pub network_if: String,
    /// `SECONDARY_NETWORK_IF`, defaults to `stt0`.
    #[serde(default = "default_secondary_network_if")]
    pub secondary_network_if: String,
    /// `NETWORK_MTU`, defaults to 1500.
    #[serde(default = "default_mtu")]
    pub network_mtu: u32,
    /// `ISO_DOWNLOAD_PATH`, defaults to `/tmp/test_images/installer-image.iso`.
    #[serde(default = "default_iso_download_path")]
    pub iso_download_path: PathBuf,
    /// `IMAGE_TYPE`, defaults to `full-iso`.
    #[serde(default)]
    pub image_type: ImageType,
    /// `PLATFORM`, defaults to `baremetal`.
    #[serde(default)]
    pub platform: Platform,
    /// `HIGH_AVAILABILITY_MODE`, defaults to `Full`.
    #[serde(default)]
    pub high_availability_mode: HighAvailabilityMode,
    /// `USER_MANAGED_NETWORKING`, defaults to false.
    #[serde(default)]
    pub user_managed_networking: bool,
    /// `IS_IPV6`, defaults to false.
    #[serde(default)]
    pub is_ipv6: bool,
    /// `BOOTSTRAP_IN_PLACE`, defaults to false.
    #[serde(default)]
    pub bootstrap_in_place: bool,
    /// `ADDITIONAL_NTP_SOURCE`, defaults to `clock.redhat.com`.
    #[serde(default = "default_ntp_source")]
    pub additional_ntp_source: String,
    /// `HTTP_PROXY_URL`.
    #[serde(default)]
    pub http_proxy_url: Option<String>,
    /// `HTTPS_PROXY_URL`.
    #[serde(default)]
    pub https_proxy_url: Option<String>,
    /// `NO_PROXY_VALUES`.
    #[serde(default)]
    pub no_proxy_values: Option<String>,
    /// `TEST_TEARDOWN`, defaults to true.
    #[serde(default = "default_true")]
    pub test_teardown: bool,
    /// `LOG_FOLDER`, defaults to `/tmp/assisted_test_infra_logs`.
    #[serde(default = "default_log_folder")]
    pub log_folder: PathBuf,
    /// `NAMESPACE`, defaults to `assisted-installer`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// `STORAGE_POOL_PATH`, defaults to `/var/lib/libvirt/openshift-images`.
    #[serde(default = "default_storage_pool_path")]
    pub storage_pool_path: PathBuf,
    /// `WORKING_DIR`, where per-cluster Terraform folders are created; defaults to
    /// `build/terraform`.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    /// `SINGLE_NODE_IP`.
    #[serde(default)]
    pub single_node_ip: Option<String>,
    /// `VSPHERE_VCENTER`.
    #[serde(default)]
    pub vsphere_vcenter: Option<String>,
    /// `VSPHERE_USERNAME`.
    #[serde(default)]
    pub vsphere_username: Option<String>,
    /// `VSPHERE_PASSWORD`.
    #[serde(default)]
    pub vsphere_password: Option<String>,
    /// `VSPHERE_CLUSTER`.
    #[serde(default)]
    pub vsphere_cluster: Option<String>,
    /// `VSPHERE_DATACENTER`.
    #[serde(default)]
    pub vsphere_datacenter: Option<String>,
    /// `VSPHERE_DATASTORE`.
    #[serde(default)]
    pub vsphere_datastore: Option<String>,
    /// `VSPHERE_NETWORK`.
    #[serde(default)]
    pub vsphere_network: Option<String>,
}

impl EnvConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(envy::from_env::<Self>().context(error::EnvironmentSnafu)?)
    }

    /// Read the configuration from an explicit set of `(VARIABLE, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, Self>(vars).context(error::EnvironmentSnafu)?)
    }

    pub fn nodes_count(&self) -> usize {
        self.num_masters + self.num_workers
    }

    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            cluster_name: self
                .cluster_name
                .clone()
                .unwrap_or_else(random_cluster_name),
            openshift_version: self.openshift_version.clone(),
            base_dns_domain: self.base_dns_domain.clone(),
            pull_secret: self.pull_secret.clone(),
            ssh_public_key: self.ssh_pub_key.clone(),
            vip_dhcp_allocation: self.vip_dhcp_allocation,
            machine_cidr: self.machine_cidr.clone(),
            service_network_cidr: self.service_cidr.clone(),
            cluster_network_cidr: self.cluster_cidr.clone(),
            host_prefix: self.host_prefix,
            platform: self.platform,
            high_availability_mode: self.high_availability_mode,
            user_managed_networking: self.user_managed_networking,
            additional_ntp_source: self.additional_ntp_source.clone(),
            image_type: self.image_type,
            iso_download_path: self.iso_download_path.clone(),
            http_proxy: self.http_proxy_url.clone(),
            https_proxy: self.https_proxy_url.clone(),
            no_proxy: self.no_proxy_values.clone(),
        }
    }

    pub fn nodes_config(&self) -> NodesConfig {
        NodesConfig {
            masters_count: self.num_masters,
            workers_count: self.num_workers,
            master_memory: self.master_memory,
            master_vcpu: self.master_cpu,
            master_disk: self.master_disk,
            master_disk_count: 1,
            master_cpu_mode: self.tf_cpu_mode.clone(),
            worker_memory: self.worker_memory,
            worker_vcpu: self.worker_cpu,
            worker_disk: self.worker_disk,
            worker_disk_count: 1,
            worker_cpu_mode: self.tf_cpu_mode.clone(),
            network_name: self.network_name.clone(),
            libvirt_network_if: self.network_if.clone(),
            libvirt_secondary_network_if: self.secondary_network_if.clone(),
            machine_cidr: self.machine_cidr.clone(),
            network_mtu: self.network_mtu,
            private_ssh_key_path: self.private_ssh_key_path.clone(),
            storage_pool_path: self.storage_pool_path.clone(),
            working_dir: self.working_dir.clone(),
            platform: self.platform,
            is_ipv6: self.is_ipv6,
            bootstrap_in_place: self.bootstrap_in_place,
            single_node_ip: self.single_node_ip.clone(),
        }
    }

    pub fn vsphere_config(&self) -> VSphereConfig {
        VSphereConfig {
            vsphere_vcenter: self.vsphere_vcenter.clone(),
            vsphere_username: self.vsphere_username.clone(),
            vsphere_password: self.vsphere_password.clone(),
            vsphere_cluster: self.vsphere_cluster.clone(),
            vsphere_datacenter: self.vsphere_datacenter.clone(),
            vsphere_datastore: self.vsphere_datastore.clone(),
            vsphere_network: self.vsphere_network.clone(),
        }
    }
}

/// What the harness asks the service for when it creates a cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub cluster_name: String,
    pub openshift_version: String,
    pub base_dns_domain: String,
    pub pull_secret: String,
    pub ssh_public_key: String,
    pub vip_dhcp_allocation: bool,
    pub machine_cidr: String,
    pub service_network_cidr: String,
    pub cluster_network_cidr: String,
    pub host_prefix: u8,
    pub platform: Platform,
    pub high_availability_mode: HighAvailabilityMode,
    pub user_managed_networking: bool,
    pub additional_ntp_source: String,
    pub image_type: ImageType,
    pub iso_download_path: PathBuf,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl Configuration for ClusterConfig {}

impl ClusterConfig {
    pub fn create_params(&self) -> ClusterCreateParams {
        ClusterCreateParams {
            name: self.cluster_name.clone(),
            openshift_version: self.openshift_version.clone(),
            pull_secret: self.pull_secret.clone(),
            ssh_public_key: Some(self.ssh_public_key.clone()).filter(|key| !key.is_empty()),
            base_dns_domain: self.base_dns_domain.clone(),
            vip_dhcp_allocation: self.vip_dhcp_allocation,
            cluster_network_cidr: self.cluster_network_cidr.clone(),
            cluster_network_host_prefix: self.host_prefix,
            service_network_cidr: self.service_network_cidr.clone(),
            high_availability_mode: self.high_availability_mode,
            user_managed_networking: self.user_managed_networking,
            additional_ntp_source: Some(self.additional_ntp_source.clone())
                .filter(|source| !source.is_empty()),
            platform: Some(PlatformParams {
                platform_type: self.platform,
            }),
            http_proxy: self.http_proxy.clone(),
            https_proxy: self.https_proxy.clone(),
            no_proxy: self.no_proxy.clone(),
        }
    }
}

/// Sizing and networking of the nodes a controller provisions. Serialized into the Terraform
/// variables file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodesConfig {
    pub masters_count: usize,
    pub workers_count: usize,
    pub master_memory: u64,
    pub master_vcpu: u32,
    /// Disk size in bytes.
    pub master_disk: u64,
    pub master_disk_count: usize,
    pub master_cpu_mode: String,
    pub worker_memory: u64,
    pub worker_vcpu: u32,
    pub worker_disk: u64,
    pub worker_disk_count: usize,
    pub worker_cpu_mode: String,
    pub network_name: String,
    pub libvirt_network_if: String,
    pub libvirt_secondary_network_if: String,
    pub machine_cidr: String,
    pub network_mtu: u32,
    pub private_ssh_key_path: PathBuf,
    pub storage_pool_path: PathBuf,
    pub working_dir: PathBuf,
    pub platform: Platform,
    pub is_ipv6: bool,
    pub bootstrap_in_place: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_node_ip: Option<String>,
}

impl Configuration for NodesConfig {}

impl NodesConfig {
    pub fn nodes_count(&self) -> usize {
        self.masters_count + self.workers_count
    }
}

/// vCenter coordinates and credentials for the vSphere backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VSphereConfig {
    pub vsphere_vcenter: Option<String>,
    pub vsphere_username: Option<String>,
    pub vsphere_password: Option<String>,
    pub vsphere_cluster: Option<String>,
    pub vsphere_datacenter: Option<String>,
    pub vsphere_datastore: Option<String>,
    pub vsphere_network: Option<String>,
}

impl Configuration for VSphereConfig {}

fn random_cluster_name() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", CLUSTER_PREFIX, &suffix[..8])
}

/// We need these to provide defaults for serde.
fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_private_ssh_key_path() -> PathBuf {
    PathBuf::from(DEFAULT_SSH_PRIVATE_KEY_PATH)
}

fn default_openshift_version() -> String {
    DEFAULT_OPENSHIFT_VERSION.to_string()
}

fn default_base_dns_domain() -> String {
    DEFAULT_BASE_DNS_DOMAIN.to_string()
}

fn default_num_masters() -> usize {
    NUMBER_OF_MASTERS
}

fn default_master_memory() -> u64 {
    16984
}

fn default_worker_memory() -> u64 {
    8892
}

fn default_master_cpu() -> u32 {
    MASTER_CPU
}

fn default_worker_cpu() -> u32 {
    WORKER_CPU
}

fn default_disk() -> u64 {
    21_474_836_480
}

fn default_cpu_mode() -> String {
    "host-passthrough".to_string()
}

fn default_true() -> bool {
    true
}

fn default_machine_cidr() -> String {
    DEFAULT_MACHINE_CIDR.to_string()
}

fn default_service_cidr() -> String {
    DEFAULT_SERVICE_CIDR.to_string()
}

fn default_cluster_cidr() -> String {
    DEFAULT_CLUSTER_CIDR.to_string()
}

fn default_host_prefix() -> u8 {
    DEFAULT_HOST_PREFIX
}

fn default_network_name() -> String {
    TEST_NETWORK.to_string()
}

fn default_network_if() -> String {
    "tt0".to_string()
}

fn default_secondary_network_if() -> String {
    "stt0".to_string()
}

fn default_mtu() -> u32 {
    1500
}

fn default_iso_download_path() -> PathBuf {
    PathBuf::from(IMAGE_FOLDER).join(IMAGE_NAME)
}

fn default_ntp_source() -> String {
    DEFAULT_ADDITIONAL_NTP_SOURCE.to_string()
}

fn default_log_folder() -> PathBuf {
    PathBuf::from(LOG_FOLDER)
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_storage_pool_path() -> PathBuf {
    PathBuf::from(STORAGE_PATH)
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(TF_FOLDER)
}

#[cfg(test)]
mod test {
    use super::*;
    use maplit::hashmap;

    fn vars(map: std::collections::HashMap<&str, &str>) -> Vec<(String, String)> {
        map.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = EnvConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config.remote_service_url, "http://localhost:8090");
        assert_eq!(config.num_masters, 3);
        assert_eq!(config.num_workers, 0);
        assert_eq!(config.nodes_count(), 3);
        assert!(config.vip_dhcp_allocation);
        assert!(config.test_teardown);
        assert_eq!(config.image_type, ImageType::FullIso);
        assert_eq!(config.platform, Platform::Baremetal);
        assert_eq!(config.host_prefix, 23);
        assert!(config
            .cluster_config()
            .cluster_name
            .starts_with("test-infra-cluster-"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = EnvConfig::from_vars(vars(hashmap! {
            "NUM_MASTERS" => "1",
            "NUM_WORKERS" => "2",
            "VIP_DHCP_ALLOCATION" => "false",
            "CLUSTER_NAME" => "my-cluster",
            "IMAGE_TYPE" => "minimal-iso",
            "PLATFORM" => "none",
            "HIGH_AVAILABILITY_MODE" => "None",
        }))
        .unwrap();
        assert_eq!(config.nodes_count(), 3);
        let cluster = config.cluster_config();
        assert_eq!(cluster.cluster_name, "my-cluster");
        assert!(!cluster.vip_dhcp_allocation);
        assert_eq!(cluster.image_type, ImageType::MinimalIso);
        assert_eq!(cluster.platform, Platform::None);
        assert_eq!(cluster.high_availability_mode, HighAvailabilityMode::None);
        let nodes = config.nodes_config();
        assert_eq!(nodes.masters_count, 1);
        assert_eq!(nodes.workers_count, 2);
    }

    #[test]
    fn create_params_omit_empty_ssh_key() {
        let config = EnvConfig::from_vars(Vec::new()).unwrap();
        let params = config.cluster_config().create_params();
        assert!(params.ssh_public_key.is_none());
        assert_eq!(params.cluster_network_host_prefix, 23);
    }

    #[test]
    fn nodes_config_into_map() {
        let config = EnvConfig::from_vars(Vec::new()).unwrap();
        let map = config.nodes_config().into_map().unwrap();
        assert_eq!(map.get("masters_count"), Some(&Value::from(3)));
        assert_eq!(map.get("platform"), Some(&Value::from("baremetal")));
        assert!(!map.contains_key("single_node_ip"));
    }
}
