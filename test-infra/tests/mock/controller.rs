use super::SharedWorld;
use node_controllers::{
    Disk, Node, NodeAddresses, NodeLifecycle, NodeProvisioner, Result, Vips,
};
use std::path::PathBuf;

/// A [`NodeLifecycle`] that powers simulated nodes instead of libvirt domains.
pub(crate) struct MockController {
    world: SharedWorld,
}

impl MockController {
    pub(crate) fn new(world: SharedWorld) -> Self {
        Self { world }
    }

    fn nodes(&self) -> Vec<Node> {
        self.world
            .lock()
            .node_names
            .iter()
            .map(|name| Node::new(name.as_str(), PathBuf::from("/tmp/id_rsa")))
            .collect()
    }
}

#[async_trait::async_trait]
impl NodeProvisioner for MockController {
    async fn prepare_nodes(&self) -> Result<Vec<Node>> {
        self.world.lock().record("prepare_nodes");
        Ok(self.nodes())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self.nodes())
    }

    async fn destroy_all_nodes(&self) -> Result<()> {
        let mut world = self.world.lock();
        world.record("destroy_all_nodes");
        world.running.clear();
        Ok(())
    }

    async fn get_cpu_cores(&self, _node_name: &str) -> Result<u32> {
        Ok(4)
    }

    async fn get_ram_kib(&self, _node_name: &str) -> Result<u64> {
        Ok(16 * 1024 * 1024)
    }
}

#[async_trait::async_trait]
impl NodeLifecycle for MockController {
    async fn start_node(&self, node_name: &str, _check_ips: bool) -> Result<()> {
        let mut world = self.world.lock();
        world.record(format!("start_node {}", node_name));
        world.node_started(node_name);
        Ok(())
    }

    async fn shutdown_node(&self, node_name: &str) -> Result<()> {
        let mut world = self.world.lock();
        world.record(format!("shutdown_node {}", node_name));
        world.running.remove(node_name);
        Ok(())
    }

    async fn restart_node(&self, node_name: &str) -> Result<()> {
        self.shutdown_node(node_name).await?;
        self.start_node(node_name, false).await
    }

    async fn start_all_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.nodes();
        let mut world = self.world.lock();
        for node in &nodes {
            world.node_started(&node.name);
        }
        Ok(nodes)
    }

    async fn shutdown_all_nodes(&self) -> Result<()> {
        self.world.lock().running.clear();
        Ok(())
    }

    async fn is_active(&self, node_name: &str) -> Result<bool> {
        Ok(self.world.lock().running.contains(node_name))
    }

    async fn get_node_ips_and_macs(&self, _node_name: &str) -> Result<NodeAddresses> {
        Ok(NodeAddresses::default())
    }

    async fn list_disks(&self, _node_name: &str) -> Result<Vec<Disk>> {
        Ok(Vec::new())
    }

    async fn format_node_disk(&self, node_name: &str, disk_index: usize) -> Result<()> {
        let mut world = self.world.lock();
        world.record(format!("format_node_disk {} {}", node_name, disk_index));
        world.wiped.insert(node_name.to_string());
        Ok(())
    }

    async fn format_all_node_disks(&self) -> Result<()> {
        Ok(())
    }

    async fn set_boot_order(&self, node_name: &str, cd_first: bool) -> Result<()> {
        let mut world = self.world.lock();
        world.record(format!("set_boot_order {} {}", node_name, cd_first));
        if cd_first {
            world.cd_first.insert(node_name.to_string());
        } else {
            world.cd_first.remove(node_name);
        }
        Ok(())
    }

    async fn attach_test_disk(
        &self,
        _node_name: &str,
        _disk_size: u64,
        _persistent: bool,
    ) -> Result<Disk> {
        Ok(Disk {
            disk_type: "file".to_string(),
            device: "disk".to_string(),
            target: "sdb".to_string(),
            source: None,
        })
    }

    async fn detach_all_test_disks(&self, _node_name: &str) -> Result<()> {
        Ok(())
    }

    fn get_ingress_and_api_vips(&self) -> Result<Vips> {
        Ok(Vips {
            api_vip: "192.168.127.100".to_string(),
            ingress_vip: "192.168.127.101".to_string(),
        })
    }

    fn get_machine_cidr(&self) -> String {
        "192.168.127.0/24".to_string()
    }

    fn get_cluster_network(&self) -> String {
        "test-infra-net-mock".to_string()
    }

    fn setup_time(&self) -> String {
        "2022-01-01 00:00:00".to_string()
    }
}
