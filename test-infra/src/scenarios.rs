use crate::cluster::Cluster;
use crate::error::{self, Result};
use crate::logs::LogCollector;
use crate::nodes::Nodes;
use assisted_test_model::clients::InstallerApi;
use assisted_test_model::constants::CLUSTER_INSTALLATION_TIMEOUT;
use assisted_test_model::{ClusterConfig, EnvConfig};
use log::{error, info, warn};
use node_controllers::{NatController, Node, NodeLifecycle};
use snafu::{ensure, OptionExt, ResultExt};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// The end-to-end flows this harness can run against a fresh cluster.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Scenario {
    /// Install a cluster on correctly configured nodes.
    Install,
    /// One node boots from the ISO after its disk was written; fix it and finish the install.
    WrongBootOrderOneNode,
    /// Every node boots from the ISO; fix all but the bootstrap first, then the bootstrap.
    WrongBootOrderAllNodes,
    /// Every node boots from the ISO; cancel and reset the stuck installation, boot the nodes
    /// back into the discovery ISO and bring the cluster to `ready` again.
    ResetCancelFromWrongBootOrder,
}

impl Scenario {
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Install => "test_install",
            Scenario::WrongBootOrderOneNode => "test_wrong_boot_order_one_node",
            Scenario::WrongBootOrderAllNodes => {
                "test_installation_succeeded_after_all_nodes_have_incorrect_boot_order"
            }
            Scenario::ResetCancelFromWrongBootOrder => "test_reset_cancel_from_incorrect_boot_order",
        }
    }
}

impl Display for Scenario {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What happens around a scenario: where logs go, and whether the cluster and nodes are removed
/// afterwards.
#[derive(Debug, Clone)]
pub struct TestSettings {
    pub test_teardown: bool,
    pub log_folder: PathBuf,
    /// Also collect libvirt logs and the journals of the nodes.
    pub collect_node_logs: bool,
    /// Where the kubeconfig of an installed cluster is written.
    pub kubeconfig_path: Option<PathBuf>,
}

impl From<&EnvConfig> for TestSettings {
    fn from(config: &EnvConfig) -> Self {
        Self {
            test_teardown: config.test_teardown,
            log_folder: config.log_folder.clone(),
            collect_node_logs: true,
            kubeconfig_path: None,
        }
    }
}

/// Owns the nodes, NAT rules and cluster of one scenario run.
pub struct TestEnvironment<A: ?Sized, C: ?Sized> {
    client: Arc<A>,
    nodes: Nodes<C>,
    nat: Option<NatController>,
    cluster_config: ClusterConfig,
    settings: TestSettings,
}

impl<A, C> TestEnvironment<A, C>
where
    A: InstallerApi + ?Sized,
    C: NodeLifecycle + ?Sized,
{
    pub fn new(
        client: Arc<A>,
        controller: Arc<C>,
        cluster_config: ClusterConfig,
        settings: TestSettings,
    ) -> Self {
        Self {
            client,
            nodes: Nodes::new(controller),
            nat: None,
            cluster_config,
            settings,
        }
    }

    /// NAT rules added once the nodes exist and removed at teardown.
    pub fn with_nat(mut self, nat: NatController) -> Self {
        self.nat = Some(nat);
        self
    }

    pub fn nodes(&self) -> &Nodes<C> {
        &self.nodes
    }

    /// Provision nodes, create a cluster, run `scenario`, and clean up. When the scenario fails its
    /// logs are collected before anything is removed.
    pub async fn run(&mut self, scenario: Scenario) -> Result<()> {
        info!("--- SETUP --- {}", scenario);
        let result = self.run_with_cluster(scenario).await;
        match &result {
            Ok(()) => info!("{} passed", scenario),
            Err(e) => error!("{} failed: {}", scenario, e),
        }
        self.teardown_nodes().await;
        result
    }

    async fn run_with_cluster(&mut self, scenario: Scenario) -> Result<()> {
        self.setup_nodes().await?;
        let cluster = Cluster::create(Arc::clone(&self.client), self.cluster_config.clone()).await?;
        let result = self.execute(scenario, &cluster).await;
        if result.is_err() {
            info!("--- TEARDOWN --- collecting logs for {}", scenario);
            self.collect_logs(scenario, &cluster).await;
        }
        self.teardown_cluster(&cluster).await;
        result
    }

    pub async fn setup_nodes(&mut self) -> Result<()> {
        self.nodes.prepare_nodes().await?;
        if let Some(nat) = &self.nat {
            nat.add_nat_rules()
                .await
                .context(error::ControllerSnafu {
                    what: "add NAT rules",
                })?;
        }
        Ok(())
    }

    /// Run `scenario` on `cluster`. Scenarios that end with an installed cluster save its
    /// kubeconfig when a path is configured.
    pub async fn execute(&self, scenario: Scenario, cluster: &Cluster<A>) -> Result<()> {
        match scenario {
            Scenario::Install => self.install(cluster).await?,
            Scenario::WrongBootOrderOneNode => self.wrong_boot_order_one_node(cluster).await?,
            Scenario::WrongBootOrderAllNodes => self.wrong_boot_order_all_nodes(cluster).await?,
            Scenario::ResetCancelFromWrongBootOrder => {
                return self.reset_cancel_from_wrong_boot_order(cluster).await
            }
        }
        self.save_kubeconfig(cluster).await
    }

    pub async fn install(&self, cluster: &Cluster<A>) -> Result<()> {
        let nodes_count = self.nodes.len();
        cluster
            .prepare_for_install(self.nodes.controller(), nodes_count)
            .await?;
        cluster
            .start_install_and_wait_for_installed(nodes_count)
            .await
    }

    pub async fn wrong_boot_order_one_node(&self, cluster: &Cluster<A>) -> Result<()> {
        let nodes_count = self.nodes.len();
        let node = self
            .nodes
            .nodes()
            .first()
            .context(error::NoNodesSnafu {
                scenario: Scenario::WrongBootOrderOneNode.name(),
            })?;
        self.nodes.set_boot_order(node, true).await?;

        self.start_install(cluster, nodes_count).await?;
        cluster.wait_for_one_host_to_be_in_wrong_boot_order(true).await?;
        cluster
            .wait_for_cluster_to_be_in_installing_pending_user_action_status()
            .await?;

        self.nodes.fix_boot_order(node).await?;
        self.finish_install(cluster, nodes_count).await
    }

    pub async fn wrong_boot_order_all_nodes(&self, cluster: &Cluster<A>) -> Result<()> {
        let nodes_count = self.nodes.len();
        for node in self.nodes.nodes() {
            self.nodes.set_boot_order(node, true).await?;
        }

        self.start_install(cluster, nodes_count).await?;
        cluster
            .wait_for_hosts_to_be_in_wrong_boot_order(nodes_count.saturating_sub(1), true)
            .await?;
        cluster
            .wait_for_cluster_to_be_in_installing_pending_user_action_status()
            .await?;

        let bootstrap: Node = self.nodes.get_bootstrap_node(cluster).await?.clone();
        for node in self.nodes.nodes() {
            if node.name != bootstrap.name {
                self.nodes.fix_boot_order(node).await?;
            }
        }
        cluster.wait_for_cluster_to_be_in_installing_status().await?;

        cluster.wait_for_one_host_to_be_in_wrong_boot_order(true).await?;
        cluster
            .wait_for_cluster_to_be_in_installing_pending_user_action_status()
            .await?;
        self.nodes.fix_boot_order(&bootstrap).await?;
        self.finish_install(cluster, nodes_count).await
    }

    /// Cancel an installation stuck on the boot order, reset it, and check that the nodes
    /// register again once they boot the discovery ISO.
    pub async fn reset_cancel_from_wrong_boot_order(&self, cluster: &Cluster<A>) -> Result<()> {
        let nodes_count = self.nodes.len();
        for node in self.nodes.nodes() {
            self.nodes.set_boot_order(node, true).await?;
        }

        self.start_install(cluster, nodes_count).await?;
        cluster
            .wait_for_hosts_to_be_in_wrong_boot_order(nodes_count.saturating_sub(1), true)
            .await?;
        cluster
            .wait_for_cluster_to_be_in_installing_pending_user_action_status()
            .await?;

        cluster.cancel_install().await?;
        ensure!(
            cluster.is_in_cancelled_status().await,
            error::ClusterNotInStatusSnafu {
                cluster_id: cluster.id(),
                expected: "cancelled",
            }
        );
        cluster.reset_install().await?;
        ensure!(
            cluster.is_in_insufficient_status().await,
            error::ClusterNotInStatusSnafu {
                cluster_id: cluster.id(),
                expected: "insufficient",
            }
        );

        self.nodes.set_correct_boot_order(false).await?;
        cluster
            .reboot_required_nodes_into_iso_after_reset(self.nodes.controller())
            .await?;

        cluster.wait_until_hosts_are_discovered(nodes_count).await?;
        cluster.wait_for_ready_to_install().await
    }

    async fn save_kubeconfig(&self, cluster: &Cluster<A>) -> Result<()> {
        if let Some(path) = &self.settings.kubeconfig_path {
            info!("Writing the kubeconfig of {} to '{}'", cluster.id(), path.display());
            cluster.download_kubeconfig(path, false).await?;
        }
        Ok(())
    }

    async fn start_install(&self, cluster: &Cluster<A>, nodes_count: usize) -> Result<()> {
        cluster
            .prepare_for_install(self.nodes.controller(), nodes_count)
            .await?;
        cluster.start_install().await?;
        cluster.wait_for_installing_in_progress(1).await
    }

    async fn finish_install(&self, cluster: &Cluster<A>, nodes_count: usize) -> Result<()> {
        cluster.wait_for_cluster_to_be_in_installing_status().await?;
        cluster.wait_for_hosts_to_install(nodes_count).await?;
        cluster.wait_for_install(CLUSTER_INSTALLATION_TIMEOUT).await
    }

    pub async fn collect_logs(&self, scenario: Scenario, cluster: &Cluster<A>) {
        let collector = LogCollector::new(
            self.client.as_ref(),
            self.settings.log_folder.join(scenario.name()),
        );
        let nodes = Some(&self.nodes).filter(|_| self.settings.collect_node_logs);
        collector.collect_test_logs(cluster.id(), nodes, true).await;
    }

    /// Cancel a running installation and delete the cluster, unless teardown is disabled.
    pub async fn teardown_cluster(&self, cluster: &Cluster<A>) {
        if !self.settings.test_teardown {
            info!("Keeping cluster {}", cluster.id());
            return;
        }
        if cluster.is_installing().await || cluster.is_finalizing().await {
            if let Err(e) = cluster.cancel_install().await {
                warn!("Unable to cancel installation of {}: {}", cluster.id(), e);
            }
        }
        info!("--- TEARDOWN --- deleting cluster {}", cluster.id());
        if let Err(e) = cluster.delete().await {
            warn!("Unable to delete cluster {}: {}", cluster.id(), e);
        }
    }

    /// Destroy the nodes and remove the NAT rules, unless teardown is disabled.
    pub async fn teardown_nodes(&mut self) {
        if !self.settings.test_teardown {
            info!("Keeping nodes");
            return;
        }
        info!("--- TEARDOWN --- node controller");
        if let Err(e) = self.nodes.destroy_all_nodes().await {
            warn!("Unable to destroy nodes: {}", e);
        }
        if let Some(nat) = &self.nat {
            nat.remove_nat_rules().await;
        }
    }
}
