use crate::command;
use crate::error::{self, Result};
use crate::nat::NatController;
use crate::node::{Disk, Node, NodeAddresses, Vips};
use crate::provisioner::{NodeLifecycle, NodeProvisioner};
use crate::terraform::{merge_vars, TfInstance, Terraform};
use assisted_test_model::constants::{HOSTS_POLL_INTERVAL, TEST_NETWORK, VIPS_OFFSET};
use assisted_test_model::waiting::{self, WaitSettings};
use assisted_test_model::{ClusterConfig, Configuration, NodesConfig};
use async_trait::async_trait;
use chrono::Local;
use ipnetwork::IpNetwork;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DOMAIN_RESOURCE: &str = "libvirt_domain";
const TEST_DISK_MARKER: &str = "test-disk";
const START_NODE_IP_TIMEOUT: Duration = Duration::from_secs(600);

/// Nodes are libvirt domains created by Terraform and then driven with `virsh` and `qemu-img`.
pub struct TerraformController {
    nodes: NodesConfig,
    cluster: ClusterConfig,
    tf: Terraform,
    setup_time: String,
}

impl TerraformController {
    /// Prepare a Terraform folder for the cluster from the template of its platform.
    pub async fn new(nodes: NodesConfig, cluster: ClusterConfig) -> Result<Self> {
        let tf =
            Terraform::create_folder(&nodes.working_dir, &cluster.cluster_name, cluster.platform)
                .await?;
        Ok(Self::with_terraform(nodes, cluster, tf))
    }

    /// Use an existing Terraform folder, e.g. to look at nodes an earlier run created.
    pub fn with_terraform(nodes: NodesConfig, cluster: ClusterConfig, tf: Terraform) -> Self {
        Self {
            nodes,
            cluster,
            tf,
            setup_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn terraform(&self) -> &Terraform {
        &self.tf
    }

    pub fn nodes_config(&self) -> &NodesConfig {
        &self.nodes
    }

    /// The interfaces NAT rules must cover: the cluster network and the secondary network.
    pub fn nat_interfaces(&self) -> Vec<String> {
        vec![
            self.nodes.libvirt_network_if.clone(),
            self.nodes.libvirt_secondary_network_if.clone(),
        ]
    }

    fn tf_vars(&self) -> Result<serde_json::Map<String, Value>> {
        let mut vars = merge_vars(vec![
            self.cluster
                .clone()
                .into_map()
                .context(error::ConfigurationSnafu)?,
            self.nodes
                .clone()
                .into_map()
                .context(error::ConfigurationSnafu)?,
        ]);
        vars.insert(
            "libvirt_network_name".to_string(),
            Value::from(self.get_cluster_network()),
        );
        vars.insert(
            "image_path".to_string(),
            Value::from(self.cluster.iso_download_path.display().to_string()),
        );
        Ok(vars)
    }

    async fn domains(&self) -> Result<Vec<TfInstance>> {
        self.tf.get_resources(DOMAIN_RESOURCE).await
    }

    async fn domain(&self, node_name: &str) -> Result<TfInstance> {
        self.domains()
            .await?
            .into_iter()
            .find(|domain| domain.str_attribute("name") == Some(node_name))
            .context(error::NodeNotFoundSnafu { name: node_name })
    }

    async fn virsh<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        command::run("virsh", args).await
    }

    async fn wait_for_ips(&self, node_name: &str) -> Result<()> {
        let settings = WaitSettings::new(START_NODE_IP_TIMEOUT).interval(HOSTS_POLL_INTERVAL);
        waiting::wait_until(
            &format!("node {} to get an IP address", node_name),
            &settings,
            || async move {
                self.get_node_ips_and_macs(node_name)
                    .await
                    .map(|addresses| !addresses.ips.is_empty())
            },
        )
        .await
        .context(error::WaitSnafu)
    }

    fn test_disk_path(&self, node_name: &str) -> PathBuf {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        self.nodes.storage_pool_path.join(format!(
            "{}-{}-{}.qcow2",
            node_name,
            TEST_DISK_MARKER,
            &suffix[..8]
        ))
    }
}

#[async_trait]
impl NodeProvisioner for TerraformController {
    async fn prepare_nodes(&self) -> Result<Vec<Node>> {
        info!(
            "Preparing {} nodes for cluster {}",
            self.nodes.nodes_count(),
            self.cluster.cluster_name
        );
        self.tf.set_and_apply(&self.tf_vars()?).await?;
        self.list_nodes().await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self
            .domains()
            .await?
            .iter()
            .filter_map(|domain| domain.str_attribute("name"))
            .map(|name| Node::new(name, self.nodes.private_ssh_key_path.clone()))
            .collect())
    }

    async fn destroy_all_nodes(&self) -> Result<()> {
        info!("Destroying nodes of cluster {}", self.cluster.cluster_name);
        self.tf.destroy().await
    }

    async fn get_cpu_cores(&self, node_name: &str) -> Result<u32> {
        self.domain(node_name).await?.u32_attribute(node_name, "vcpu")
    }

    async fn get_ram_kib(&self, node_name: &str) -> Result<u64> {
        let memory_mib = self
            .domain(node_name)
            .await?
            .u64_attribute("memory")
            .context(error::MissingAttributeSnafu {
                name: node_name,
                attribute: "memory",
            })?;
        Ok(memory_mib * 1024)
    }
}

#[async_trait]
impl NodeLifecycle for TerraformController {
    async fn start_node(&self, node_name: &str, check_ips: bool) -> Result<()> {
        if self.is_active(node_name).await? {
            debug!("Node {} is already running", node_name);
        } else {
            info!("Starting node {}", node_name);
            self.virsh(["start", node_name]).await?;
        }
        if check_ips {
            self.wait_for_ips(node_name).await?;
        }
        Ok(())
    }

    async fn shutdown_node(&self, node_name: &str) -> Result<()> {
        if self.is_active(node_name).await? {
            info!("Powering off node {}", node_name);
            self.virsh(["destroy", node_name]).await?;
        }
        Ok(())
    }

    async fn restart_node(&self, node_name: &str) -> Result<()> {
        self.shutdown_node(node_name).await?;
        self.start_node(node_name, false).await
    }

    async fn start_all_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.list_nodes().await?;
        for node in &nodes {
            self.start_node(&node.name, true).await?;
        }
        Ok(nodes)
    }

    async fn shutdown_all_nodes(&self) -> Result<()> {
        for node in self.list_nodes().await? {
            self.shutdown_node(&node.name).await?;
        }
        Ok(())
    }

    async fn is_active(&self, node_name: &str) -> Result<bool> {
        let state = self.virsh(["domstate", node_name]).await?;
        Ok(state.trim() == "running")
    }

    async fn get_node_ips_and_macs(&self, node_name: &str) -> Result<NodeAddresses> {
        let output = self.virsh(["domifaddr", node_name]).await?;
        Ok(NodeAddresses::parse_domifaddr(&output))
    }

    async fn list_disks(&self, node_name: &str) -> Result<Vec<Disk>> {
        let output = self.virsh(["domblklist", node_name, "--details"]).await?;
        Ok(Disk::parse_domblklist(&output))
    }

    async fn format_node_disk(&self, node_name: &str, disk_index: usize) -> Result<()> {
        let source = self
            .list_disks(node_name)
            .await?
            .into_iter()
            .filter(Disk::is_disk)
            .nth(disk_index)
            .and_then(|disk| disk.source)
            .context(error::DiskNotFoundSnafu {
                name: node_name,
                index: disk_index,
            })?;
        info!("Formatting disk '{}' of node {}", source, node_name);
        format_disk(&source).await
    }

    async fn format_all_node_disks(&self) -> Result<()> {
        for node in self.list_nodes().await? {
            self.format_node_disk(&node.name, 0).await?;
        }
        Ok(())
    }

    async fn set_boot_order(&self, node_name: &str, cd_first: bool) -> Result<()> {
        let order = if cd_first { "cdrom,hd" } else { "hd,cdrom" };
        info!("Setting boot order of node {} to {}", node_name, order);
        command::run("virt-xml", [node_name, "--edit", "--boot", order]).await?;
        Ok(())
    }

    async fn attach_test_disk(
        &self,
        node_name: &str,
        disk_size: u64,
        persistent: bool,
    ) -> Result<Disk> {
        let used: Vec<String> = self
            .list_disks(node_name)
            .await?
            .into_iter()
            .map(|disk| disk.target)
            .collect();
        let target = ('a'..='z')
            .map(|letter| format!("sd{}", letter))
            .find(|target| !used.contains(target))
            .context(error::NoFreeDiskTargetSnafu { name: node_name })?;
        let path = self.test_disk_path(node_name);
        let source = path.display().to_string();
        command::run(
            "qemu-img",
            ["create", "-f", "qcow2", source.as_str(), disk_size.to_string().as_str()],
        )
        .await?;
        let scope = if persistent { "--persistent" } else { "--live" };
        info!(
            "Attaching test disk '{}' to node {} as {}",
            source, node_name, target
        );
        self.virsh([
            "attach-disk",
            node_name,
            source.as_str(),
            target.as_str(),
            "--subdriver",
            "qcow2",
            "--targetbus",
            "scsi",
            scope,
        ])
        .await?;
        Ok(Disk {
            disk_type: "file".to_string(),
            device: "disk".to_string(),
            target,
            source: Some(source),
        })
    }

    async fn detach_all_test_disks(&self, node_name: &str) -> Result<()> {
        for disk in self.list_disks(node_name).await? {
            let source = match &disk.source {
                Some(source) if source.contains(TEST_DISK_MARKER) => source,
                _ => continue,
            };
            info!("Detaching test disk '{}' from node {}", source, node_name);
            self.virsh(["detach-disk", node_name, disk.target.as_str(), "--persistent"])
                .await?;
            tokio::fs::remove_file(source)
                .await
                .context(error::IoSnafu { path: source })?;
        }
        Ok(())
    }

    fn get_ingress_and_api_vips(&self) -> Result<Vips> {
        vips(&self.nodes.machine_cidr)
    }

    fn get_machine_cidr(&self) -> String {
        self.nodes.machine_cidr.clone()
    }

    fn get_cluster_network(&self) -> String {
        cluster_network(&self.nodes.network_name, &self.nodes.libvirt_network_if)
    }

    fn setup_time(&self) -> String {
        self.setup_time.clone()
    }
}

/// A network name that is only the `test-infra-net-` prefix is completed with the namespace index
/// of the network interface.
fn cluster_network(network_name: &str, network_if: &str) -> String {
    if network_name == TEST_NETWORK {
        format!(
            "{}{}",
            network_name,
            NatController::get_namespace_index(network_if)
        )
    } else {
        network_name.to_string()
    }
}

/// The API VIP is the machine network address plus 100, the ingress VIP the one after it.
pub fn vips(machine_cidr: &str) -> Result<Vips> {
    let network = IpNetwork::from_str(machine_cidr).context(error::InvalidCidrSnafu {
        cidr: machine_cidr,
    })?;
    Ok(Vips {
        api_vip: nth_address(&network, VIPS_OFFSET)?.to_string(),
        ingress_vip: nth_address(&network, VIPS_OFFSET + 1)?.to_string(),
    })
}

fn nth_address(network: &IpNetwork, offset: u32) -> Result<IpAddr> {
    let address = match network.network() {
        IpAddr::V4(base) => u32::from(base)
            .checked_add(offset)
            .map(|address| IpAddr::from(std::net::Ipv4Addr::from(address))),
        IpAddr::V6(base) => u128::from(base)
            .checked_add(u128::from(offset))
            .map(|address| IpAddr::from(std::net::Ipv6Addr::from(address))),
    };
    address
        .filter(|address| network.contains(*address))
        .context(error::VipOutOfRangeSnafu {
            cidr: network.to_string(),
            offset,
        })
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    #[serde(rename = "virtual-size")]
    virtual_size: u64,
}

/// Recreate a qcow2 image with its original virtual size, dropping its contents.
async fn format_disk(path: &str) -> Result<()> {
    let info = command::run("qemu-img", ["info", "--output=json", "-U", path]).await?;
    let info: ImageInfo =
        serde_json::from_str(&info).context(error::DeserializeJsonSnafu { what: "qemu-img info" })?;
    command::run(
        "qemu-img",
        [
            "create",
            "-f",
            "qcow2",
            path,
            info.virtual_size.to_string().as_str(),
        ],
    )
    .await?;
    Ok(())
}
