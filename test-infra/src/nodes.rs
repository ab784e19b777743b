use crate::cluster::Cluster;
use crate::error::{self, Result};
use assisted_test_model::clients::InstallerApi;
use log::info;
use node_controllers::{Node, NodeLifecycle, NodeProvisioner};
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;

/// The nodes of one test, and the controller that owns them.
pub struct Nodes<C: ?Sized> {
    controller: Arc<C>,
    nodes: Vec<Node>,
}

impl<C> Nodes<C>
where
    C: NodeProvisioner + ?Sized,
{
    pub fn new(controller: Arc<C>) -> Self {
        Self {
            controller,
            nodes: Vec::new(),
        }
    }

    pub fn controller(&self) -> &C {
        self.controller.as_ref()
    }

    pub fn controller_arc(&self) -> Arc<C> {
        Arc::clone(&self.controller)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub async fn prepare_nodes(&mut self) -> Result<()> {
        self.nodes = self
            .controller
            .prepare_nodes()
            .await
            .context(error::ControllerSnafu {
                what: "prepare nodes",
            })?;
        info!("Prepared nodes {:?}", self.names());
        Ok(())
    }

    /// Re-read the node list from the controller.
    pub async fn refresh(&mut self) -> Result<()> {
        self.nodes = self
            .controller
            .list_nodes()
            .await
            .context(error::ControllerSnafu { what: "list nodes" })?;
        Ok(())
    }

    pub async fn destroy_all_nodes(&mut self) -> Result<()> {
        info!("Destroying nodes {:?}", self.names());
        self.controller
            .destroy_all_nodes()
            .await
            .context(error::ControllerSnafu {
                what: "destroy nodes",
            })?;
        self.nodes.clear();
        Ok(())
    }

    pub fn get_node(&self, name: &str) -> Result<&Node> {
        self.nodes
            .iter()
            .find(|node| node.name == name)
            .context(error::NodeNotFoundSnafu { name })
    }

    pub fn get_masters(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.is_master()).collect()
    }

    pub fn get_workers(&self) -> Vec<&Node> {
        self.nodes.iter().filter(|node| node.is_worker()).collect()
    }

    /// The node the cluster picked as bootstrap.
    pub async fn get_bootstrap_node<A>(&self, cluster: &Cluster<A>) -> Result<&Node>
    where
        A: InstallerApi + ?Sized,
    {
        let hostname = cluster.get_bootstrap_hostname().await?;
        self.get_node(&hostname)
    }

    fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|node| node.name.as_str()).collect()
    }
}

impl<C> Nodes<C>
where
    C: NodeLifecycle + ?Sized,
{
    pub async fn start_all(&mut self) -> Result<()> {
        self.nodes = self
            .controller
            .start_all_nodes()
            .await
            .context(error::ControllerSnafu {
                what: "start nodes",
            })?;
        Ok(())
    }

    pub async fn shutdown_all(&self) -> Result<()> {
        self.controller
            .shutdown_all_nodes()
            .await
            .context(error::ControllerSnafu {
                what: "shut down nodes",
            })
    }

    pub async fn start_given(&self, nodes: &[&Node]) -> Result<()> {
        for node in nodes {
            self.controller
                .start_node(&node.name, true)
                .await
                .context(error::ControllerSnafu { what: "start node" })?;
        }
        Ok(())
    }

    pub async fn shutdown_given(&self, nodes: &[&Node]) -> Result<()> {
        for node in nodes {
            self.controller
                .shutdown_node(&node.name)
                .await
                .context(error::ControllerSnafu {
                    what: "shut down node",
                })?;
        }
        Ok(())
    }

    pub async fn set_boot_order(&self, node: &Node, cd_first: bool) -> Result<()> {
        self.controller
            .set_boot_order(&node.name, cd_first)
            .await
            .context(error::ControllerSnafu {
                what: "set boot order",
            })
    }

    /// Power the node off, let it boot from its disk, and power it on again.
    pub async fn fix_boot_order(&self, node: &Node) -> Result<()> {
        self.shutdown_given(&[node]).await?;
        self.set_boot_order(node, false).await?;
        self.controller
            .start_node(&node.name, false)
            .await
            .context(error::ControllerSnafu { what: "start node" })
    }

    /// Put every node back to disk-first boot order, optionally starting them again.
    pub async fn set_correct_boot_order(&self, start_nodes: bool) -> Result<()> {
        for node in &self.nodes {
            self.shutdown_given(&[node]).await?;
            self.set_boot_order(node, false).await?;
        }
        if start_nodes {
            for node in &self.nodes {
                self.controller
                    .start_node(&node.name, false)
                    .await
                    .context(error::ControllerSnafu { what: "start node" })?;
            }
        }
        Ok(())
    }

    /// The first IP address of the node.
    pub async fn node_ip(&self, node: &Node) -> Result<String> {
        self.controller
            .get_node_ips_and_macs(&node.name)
            .await
            .context(error::ControllerSnafu {
                what: "get node addresses",
            })?
            .ips
            .into_iter()
            .next()
            .context(error::NoNodeIpSnafu { name: &node.name })
    }

    pub fn get_cluster_network(&self) -> String {
        self.controller.get_cluster_network()
    }

    pub fn setup_time(&self) -> String {
        self.controller.setup_time()
    }
}
