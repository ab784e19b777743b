use crate::error::Result;
use crate::node::{Disk, Node, NodeAddresses, Vips};
use async_trait::async_trait;

/// What every node backend can do: bring a set of nodes up, describe them, and tear them down.
#[async_trait]
pub trait NodeProvisioner: Send + Sync {
    /// Create the nodes of the cluster and return them.
    async fn prepare_nodes(&self) -> Result<Vec<Node>>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn destroy_all_nodes(&self) -> Result<()>;

    async fn get_cpu_cores(&self, node_name: &str) -> Result<u32>;

    async fn get_ram_kib(&self, node_name: &str) -> Result<u64>;
}

/// Power, disk and network control over individual nodes. Only backends that own the hypervisor
/// (libvirt) implement this.
#[async_trait]
pub trait NodeLifecycle: NodeProvisioner {
    /// Start the node. With `check_ips` the call returns once the node has an IP address.
    async fn start_node(&self, node_name: &str, check_ips: bool) -> Result<()>;

    async fn shutdown_node(&self, node_name: &str) -> Result<()>;

    async fn restart_node(&self, node_name: &str) -> Result<()>;

    async fn start_all_nodes(&self) -> Result<Vec<Node>>;

    async fn shutdown_all_nodes(&self) -> Result<()>;

    async fn is_active(&self, node_name: &str) -> Result<bool>;

    async fn get_node_ips_and_macs(&self, node_name: &str) -> Result<NodeAddresses>;

    async fn list_disks(&self, node_name: &str) -> Result<Vec<Disk>>;

    /// Wipe the `disk_index`th disk (cdroms excluded) of a node that is shut down.
    async fn format_node_disk(&self, node_name: &str, disk_index: usize) -> Result<()>;

    async fn format_all_node_disks(&self) -> Result<()>;

    /// Boot from the cdrom first when `cd_first`, otherwise from the hard disk first.
    async fn set_boot_order(&self, node_name: &str, cd_first: bool) -> Result<()>;

    /// Attach an empty disk of `disk_size` bytes. A `persistent` disk survives a node restart.
    async fn attach_test_disk(
        &self,
        node_name: &str,
        disk_size: u64,
        persistent: bool,
    ) -> Result<Disk>;

    async fn detach_all_test_disks(&self, node_name: &str) -> Result<()>;

    fn get_ingress_and_api_vips(&self) -> Result<Vips>;

    fn get_machine_cidr(&self) -> String;

    fn get_cluster_network(&self) -> String;

    /// When this controller was created, formatted for `journalctl --since`.
    fn setup_time(&self) -> String;
}
