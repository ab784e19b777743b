use crate::error::{self, Result};
use crate::node::Node;
use crate::provisioner::NodeProvisioner;
use crate::terraform::{merge_vars, TfInstance, Terraform};
use assisted_test_model::{ClusterConfig, Configuration, NodesConfig, VSphereConfig};
use async_trait::async_trait;
use log::info;
use serde_json::{Map, Value};
use snafu::{OptionExt, ResultExt};

const VM_RESOURCE: &str = "vsphere_virtual_machine";

/// Nodes are vSphere virtual machines created by Terraform. Everything known about them comes
/// from the Terraform state; there is no power or disk control.
pub struct VSphereController {
    nodes: NodesConfig,
    cluster: ClusterConfig,
    vsphere: VSphereConfig,
    tf: Terraform,
}

impl VSphereController {
    pub async fn new(
        nodes: NodesConfig,
        cluster: ClusterConfig,
        vsphere: VSphereConfig,
    ) -> Result<Self> {
        let tf =
            Terraform::create_folder(&nodes.working_dir, &cluster.cluster_name, cluster.platform)
                .await?;
        Ok(Self::with_terraform(nodes, cluster, vsphere, tf))
    }

    pub fn with_terraform(
        nodes: NodesConfig,
        cluster: ClusterConfig,
        vsphere: VSphereConfig,
        tf: Terraform,
    ) -> Self {
        Self {
            nodes,
            cluster,
            vsphere,
            tf,
        }
    }

    /// Apply again now that the discovery ISO exists, so the VMs boot from it.
    pub async fn iso_ready(&self) -> Result<()> {
        info!(
            "Attaching the discovery image to the VMs of cluster {}",
            self.cluster.cluster_name
        );
        self.tf.set_and_apply(&self.tf_vars(true)?).await
    }

    /// The ISO does not exist before the cluster is prepared for installation, so its path is
    /// left out of the variables until then.
    fn tf_vars(&self, with_iso: bool) -> Result<Map<String, Value>> {
        let mut vars = merge_vars(vec![
            self.nodes
                .clone()
                .into_map()
                .context(error::ConfigurationSnafu)?,
            self.vsphere
                .clone()
                .into_map()
                .context(error::ConfigurationSnafu)?,
            self.cluster
                .clone()
                .into_map()
                .context(error::ConfigurationSnafu)?,
        ]);
        vars.insert(
            "cluster_name".to_string(),
            Value::from(self.cluster.cluster_name.clone()),
        );
        if !with_iso {
            vars.remove("iso_download_path");
        }
        Ok(vars)
    }

    async fn vms(&self) -> Result<Vec<TfInstance>> {
        self.tf.get_resources(VM_RESOURCE).await
    }

    async fn vm(&self, node_name: &str) -> Result<TfInstance> {
        self.vms()
            .await?
            .into_iter()
            .find(|vm| vm.str_attribute("name") == Some(node_name))
            .context(error::NodeNotFoundSnafu { name: node_name })
    }
}

#[async_trait]
impl NodeProvisioner for VSphereController {
    async fn prepare_nodes(&self) -> Result<Vec<Node>> {
        self.tf.set_and_apply(&self.tf_vars(false)?).await?;
        self.list_nodes().await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        Ok(self
            .vms()
            .await?
            .iter()
            .filter_map(|vm| vm.str_attribute("name"))
            .map(|name| Node::new(name, self.nodes.private_ssh_key_path.clone()))
            .collect())
    }

    async fn destroy_all_nodes(&self) -> Result<()> {
        self.tf.destroy().await
    }

    async fn get_cpu_cores(&self, node_name: &str) -> Result<u32> {
        self.vm(node_name).await?.u32_attribute(node_name, "num_cpus")
    }

    async fn get_ram_kib(&self, node_name: &str) -> Result<u64> {
        let memory_mib = self
            .vm(node_name)
            .await?
            .u64_attribute("memory")
            .context(error::MissingAttributeSnafu {
                name: node_name,
                attribute: "memory",
            })?;
        Ok(memory_mib * 1024)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assisted_test_model::EnvConfig;

    const STATE: &str = r#"{
        "resources": [
            {
                "type": "vsphere_virtual_machine",
                "name": "master",
                "instances": [
                    {"attributes": {"name": "vsphere-master-0", "num_cpus": 4, "memory": 16384}},
                    {"attributes": {"name": "vsphere-master-1", "num_cpus": 4, "memory": 16384}}
                ]
            }
        ]
    }"#;

    async fn controller(dir: &std::path::Path) -> VSphereController {
        let config = EnvConfig::from_vars(vec![
            ("CLUSTER_NAME".to_string(), "vsphere".to_string()),
            ("VSPHERE_VCENTER".to_string(), "vcenter.example.com".to_string()),
        ])
        .unwrap();
        let tf = Terraform::new(dir);
        tokio::fs::write(tf.tfstate_path(), STATE).await.unwrap();
        VSphereController::with_terraform(
            config.nodes_config(),
            config.cluster_config(),
            config.vsphere_config(),
            tf,
        )
    }

    #[tokio::test]
    async fn nodes_from_state() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path()).await;
        let names: Vec<String> = controller
            .list_nodes()
            .await
            .unwrap()
            .into_iter()
            .map(|node| node.name)
            .collect();
        assert_eq!(names, vec!["vsphere-master-0", "vsphere-master-1"]);
        assert_eq!(controller.get_cpu_cores("vsphere-master-1").await.unwrap(), 4);
        assert_eq!(
            controller.get_ram_kib("vsphere-master-0").await.unwrap(),
            16384 * 1024
        );
        assert!(controller.get_cpu_cores("vsphere-master-9").await.is_err());
    }

    #[tokio::test]
    async fn iso_path_only_once_ready() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller(dir.path()).await;
        let before = controller.tf_vars(false).unwrap();
        assert!(!before.contains_key("iso_download_path"));
        assert_eq!(before.get("cluster_name"), Some(&Value::from("vsphere")));
        assert_eq!(
            before.get("vsphere_vcenter"),
            Some(&Value::from("vcenter.example.com"))
        );
        assert!(controller
            .tf_vars(true)
            .unwrap()
            .contains_key("iso_download_path"));
    }
}
