use crate::error::{self, Result};
use assisted_test_model::clients::InstallerApi;
use assisted_test_model::constants::{
    CLUSTER_INSTALLATION_TIMEOUT, CLUSTER_POLL_INTERVAL, ERROR_TIMEOUT,
    INSTALLING_IN_PROGRESS_TIMEOUT, NODES_REGISTERED_TIMEOUT, PENDING_USER_ACTION_TIMEOUT,
    READY_TIMEOUT, START_CLUSTER_INSTALLATION_TIMEOUT,
};
use assisted_test_model::waiting::{self, WaitSettings};
use assisted_test_model::{
    Cluster as ClusterDetails, ClusterConfig, ClusterReport, ClusterStatus, ClusterUpdateParams,
    Host, HostRoleUpdate, HostStatus, NodeRole,
};
use log::info;
use node_controllers::{NodeLifecycle, VSphereController, Vips};
use snafu::{OptionExt, ResultExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// One cluster of the assisted service, and the steps a test takes with it.
pub struct Cluster<A: InstallerApi + ?Sized> {
    client: Arc<A>,
    id: String,
    config: ClusterConfig,
}

impl<A> Cluster<A>
where
    A: InstallerApi + ?Sized,
{
    /// Create a new cluster from `config`.
    pub async fn create(client: Arc<A>, config: ClusterConfig) -> Result<Self> {
        let details = client
            .create_cluster(&config.create_params())
            .await
            .context(error::ClientSnafu {
                what: "create cluster",
            })?;
        Ok(Self {
            client,
            id: details.id,
            config,
        })
    }

    /// Work with an existing cluster.
    pub fn attach<S: Into<String>>(client: Arc<A>, id: S, config: ClusterConfig) -> Self {
        Self {
            client,
            id: id.into(),
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn client(&self) -> &A {
        self.client.as_ref()
    }

    pub async fn details(&self) -> Result<ClusterDetails> {
        self.client
            .cluster_get(&self.id)
            .await
            .context(error::ClientSnafu { what: "get cluster" })
    }

    pub async fn hosts(&self) -> Result<Vec<Host>> {
        self.client
            .get_cluster_hosts(&self.id)
            .await
            .context(error::ClientSnafu {
                what: "get cluster hosts",
            })
    }

    pub async fn report(&self) -> Result<ClusterReport> {
        Ok(ClusterReport::new(self.details().await?, self.hosts().await?))
    }

    pub async fn delete(&self) -> Result<()> {
        self.client
            .delete_cluster(&self.id)
            .await
            .context(error::ClientSnafu {
                what: "delete cluster",
            })
    }

    pub async fn generate_and_download_image(&self) -> Result<()> {
        let ssh_key = Some(self.config.ssh_public_key.as_str()).filter(|key| !key.is_empty());
        self.client
            .generate_and_download_image(
                &self.id,
                ssh_key,
                self.config.image_type,
                &self.config.iso_download_path,
            )
            .await
            .context(error::ClientSnafu {
                what: "generate and download the discovery image",
            })
    }

    pub async fn download_kubeconfig(&self, path: &Path, no_ingress: bool) -> Result<()> {
        let kubeconfig = self
            .client
            .download_kubeconfig(&self.id, no_ingress)
            .await
            .context(error::ClientSnafu {
                what: "download kubeconfig",
            })?;
        tokio::fs::write(path, &kubeconfig)
            .await
            .context(error::WriteSnafu { path })
    }

    pub async fn wait_until_hosts_are_discovered(&self, nodes_count: usize) -> Result<()> {
        self.wait_for_all_hosts(
            &[HostStatus::PendingForInput, HostStatus::Known],
            nodes_count,
            &WaitSettings::new(NODES_REGISTERED_TIMEOUT),
        )
        .await
    }

    /// Hosts whose requested hostname contains `master` become masters, all others workers.
    pub async fn set_host_roles(&self) -> Result<()> {
        let hosts_roles: Vec<HostRoleUpdate> = self
            .hosts()
            .await?
            .iter()
            .map(|host| HostRoleUpdate {
                id: host.id.clone(),
                role: if host.name().contains("master") {
                    NodeRole::Master
                } else {
                    NodeRole::Worker
                },
            })
            .collect();
        info!("Setting roles of {} hosts", hosts_roles.len());
        self.update(ClusterUpdateParams {
            hosts_roles,
            ..Default::default()
        })
        .await
    }

    /// With VIP DHCP allocation the service only needs the machine network, otherwise the VIPs
    /// come from the controller.
    pub async fn set_network_params<C>(&self, controller: &C) -> Result<()>
    where
        C: NodeLifecycle + ?Sized,
    {
        if self.config.vip_dhcp_allocation {
            self.set_machine_cidr(&self.config.machine_cidr).await
        } else {
            let vips = controller
                .get_ingress_and_api_vips()
                .context(error::ControllerSnafu { what: "get VIPs" })?;
            self.set_ingress_and_api_vips(&vips).await
        }
    }

    pub async fn set_machine_cidr(&self, machine_cidr: &str) -> Result<()> {
        info!(
            "Setting machine network CIDR {} for cluster {}",
            machine_cidr, self.id
        );
        self.update(ClusterUpdateParams {
            machine_network_cidr: Some(machine_cidr.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn set_ingress_and_api_vips(&self, vips: &Vips) -> Result<()> {
        info!(
            "Setting API VIP {} and ingress VIP {} for cluster {}",
            vips.api_vip, vips.ingress_vip, self.id
        );
        self.update(ClusterUpdateParams {
            api_vip: Some(vips.api_vip.clone()),
            ingress_vip: Some(vips.ingress_vip.clone()),
            ..Default::default()
        })
        .await
    }

    async fn update(&self, params: ClusterUpdateParams) -> Result<()> {
        self.client
            .update_cluster(&self.id, &params)
            .await
            .context(error::ClientSnafu {
                what: "update cluster",
            })?;
        Ok(())
    }

    pub async fn start_install(&self) -> Result<()> {
        self.client
            .install_cluster(&self.id)
            .await
            .context(error::ClientSnafu {
                what: "start installation",
            })?;
        Ok(())
    }

    pub async fn cancel_install(&self) -> Result<()> {
        self.client
            .cancel_cluster_install(&self.id)
            .await
            .context(error::ClientSnafu {
                what: "cancel installation",
            })?;
        Ok(())
    }

    pub async fn reset_install(&self) -> Result<()> {
        self.client
            .reset_cluster_install(&self.id)
            .await
            .context(error::ClientSnafu {
                what: "reset installation",
            })?;
        Ok(())
    }

    pub async fn wait_for_installing_in_progress(&self, nodes_count: usize) -> Result<()> {
        self.wait_for_some_hosts(
            &[HostStatus::InstallingInProgress],
            nodes_count,
            &WaitSettings::new(INSTALLING_IN_PROGRESS_TIMEOUT),
        )
        .await
    }

    pub async fn wait_for_node_status(
        &self,
        statuses: &[HostStatus],
        nodes_count: usize,
    ) -> Result<()> {
        self.wait_for_some_hosts(
            statuses,
            nodes_count,
            &WaitSettings::new(INSTALLING_IN_PROGRESS_TIMEOUT),
        )
        .await
    }

    pub async fn wait_for_one_host_to_be_in_wrong_boot_order(
        &self,
        fall_on_error_status: bool,
    ) -> Result<()> {
        self.wait_for_some_hosts(
            &[HostStatus::InstallingPendingUserAction],
            1,
            &WaitSettings::new(PENDING_USER_ACTION_TIMEOUT)
                .fall_on_error_status(fall_on_error_status),
        )
        .await
    }

    pub async fn wait_for_hosts_to_be_in_wrong_boot_order(
        &self,
        nodes_count: usize,
        fall_on_error_status: bool,
    ) -> Result<()> {
        self.wait_for_all_hosts(
            &[HostStatus::InstallingPendingUserAction],
            nodes_count,
            &WaitSettings::new(PENDING_USER_ACTION_TIMEOUT)
                .fall_on_error_status(fall_on_error_status),
        )
        .await
    }

    pub async fn wait_for_hosts_to_install(&self, nodes_count: usize) -> Result<()> {
        self.wait_for_nodes_to_install(nodes_count, CLUSTER_INSTALLATION_TIMEOUT)
            .await
    }

    pub async fn wait_for_nodes_to_install(
        &self,
        nodes_count: usize,
        timeout: Duration,
    ) -> Result<()> {
        self.wait_for_all_hosts(
            &[HostStatus::Installed],
            nodes_count,
            &WaitSettings::new(timeout),
        )
        .await
    }

    pub async fn wait_for_cluster_in_error_status(&self) -> Result<()> {
        self.wait_for_cluster(&[ClusterStatus::Error], &[], ERROR_TIMEOUT)
            .await
    }

    pub async fn wait_for_ready_to_install(&self) -> Result<()> {
        self.wait_for_cluster(&[ClusterStatus::Ready], &[], READY_TIMEOUT)
            .await
    }

    pub async fn wait_for_cluster_to_be_in_installing_status(&self) -> Result<()> {
        self.wait_for_cluster(
            &[ClusterStatus::Installing],
            &[],
            START_CLUSTER_INSTALLATION_TIMEOUT,
        )
        .await
    }

    pub async fn wait_for_cluster_to_be_in_installing_pending_user_action_status(
        &self,
    ) -> Result<()> {
        self.wait_for_cluster(
            &[ClusterStatus::InstallingPendingUserAction],
            &[],
            PENDING_USER_ACTION_TIMEOUT,
        )
        .await
    }

    pub async fn wait_for_install(&self, timeout: Duration) -> Result<()> {
        self.wait_for_cluster(
            &[ClusterStatus::Installed],
            &[ClusterStatus::Cancelled],
            timeout,
        )
        .await
    }

    pub async fn is_in_cancelled_status(&self) -> bool {
        self.is_in_status(&[ClusterStatus::Cancelled]).await
    }

    pub async fn is_in_insufficient_status(&self) -> bool {
        self.is_in_status(&[ClusterStatus::Insufficient]).await
    }

    pub async fn is_installing(&self) -> bool {
        self.is_in_status(&[ClusterStatus::Installing]).await
    }

    pub async fn is_finalizing(&self) -> bool {
        self.is_in_status(&[ClusterStatus::Finalizing]).await
    }

    pub async fn is_in_status(&self, statuses: &[ClusterStatus]) -> bool {
        waiting::is_cluster_in_status(self.client.as_ref(), &self.id, statuses).await
    }

    pub async fn get_nodes_by_role(&self, role: NodeRole) -> Result<Vec<Host>> {
        let hosts: Vec<Host> = self
            .hosts()
            .await?
            .into_iter()
            .filter(|host| host.role == role)
            .collect();
        info!("Found {} hosts with the role {}", hosts.len(), role);
        Ok(hosts)
    }

    pub async fn get_bootstrap_hostname(&self) -> Result<String> {
        let bootstrap = self
            .get_nodes_by_role(NodeRole::Master)
            .await?
            .into_iter()
            .find(|host| host.bootstrap)
            .context(error::NoBootstrapSnafu {
                cluster_id: &self.id,
            })?;
        info!("Bootstrap node is {}", bootstrap.name());
        Ok(bootstrap.name().to_string())
    }

    pub async fn get_reboot_required_nodes(&self) -> Result<Vec<Host>> {
        self.client
            .get_hosts_in_statuses(&self.id, &[HostStatus::ResettingPendingUserAction])
            .await
            .context(error::ClientSnafu {
                what: "get hosts pending a reboot",
            })
    }

    /// After a reset, hosts waiting for a reboot are powered off, have their disk wiped and are
    /// started again so they boot the discovery ISO.
    pub async fn reboot_required_nodes_into_iso_after_reset<C>(&self, controller: &C) -> Result<()>
    where
        C: NodeLifecycle + ?Sized,
    {
        for host in self.get_reboot_required_nodes().await? {
            let node_name = host.name();
            info!("Rebooting node {} into the discovery ISO", node_name);
            controller
                .shutdown_node(node_name)
                .await
                .context(error::ControllerSnafu { what: "shut down node" })?;
            controller
                .format_node_disk(node_name, 0)
                .await
                .context(error::ControllerSnafu {
                    what: "format node disk",
                })?;
            controller
                .start_node(node_name, false)
                .await
                .context(error::ControllerSnafu { what: "start node" })?;
        }
        Ok(())
    }

    /// Download the ISO, boot the nodes, wait for them to register and bring the cluster to
    /// `ready`.
    pub async fn prepare_for_install<C>(&self, controller: &C, nodes_count: usize) -> Result<()>
    where
        C: NodeLifecycle + ?Sized,
    {
        self.generate_and_download_image().await?;
        controller
            .start_all_nodes()
            .await
            .context(error::ControllerSnafu {
                what: "start nodes",
            })?;
        self.wait_until_hosts_are_discovered(nodes_count).await?;
        self.set_host_roles().await?;
        self.set_network_params(controller).await?;
        self.wait_for_ready_to_install().await
    }

    /// vSphere VMs cannot be started individually; re-applying Terraform once the ISO exists
    /// boots them from it.
    pub async fn prepare_for_install_on_vsphere(
        &self,
        controller: &VSphereController,
        nodes_count: usize,
    ) -> Result<()> {
        self.generate_and_download_image().await?;
        controller
            .iso_ready()
            .await
            .context(error::ControllerSnafu {
                what: "boot the VMs from the discovery image",
            })?;
        self.wait_until_hosts_are_discovered(nodes_count).await?;
        self.set_host_roles().await?;
        if self.config.vip_dhcp_allocation {
            self.set_machine_cidr(&self.config.machine_cidr).await?;
        }
        self.wait_for_ready_to_install().await
    }

    pub async fn start_install_and_wait_for_installed(&self, nodes_count: usize) -> Result<()> {
        self.start_install().await?;
        self.wait_for_installing_in_progress(1).await?;
        self.wait_for_hosts_to_install(nodes_count).await?;
        self.wait_for_install(CLUSTER_INSTALLATION_TIMEOUT).await
    }

    async fn wait_for_all_hosts(
        &self,
        statuses: &[HostStatus],
        nodes_count: usize,
        settings: &WaitSettings,
    ) -> Result<()> {
        waiting::wait_till_all_hosts_are_in_status(
            self.client.as_ref(),
            &self.id,
            statuses,
            nodes_count,
            settings,
        )
        .await
        .context(error::WaitSnafu)
    }

    async fn wait_for_some_hosts(
        &self,
        statuses: &[HostStatus],
        nodes_count: usize,
        settings: &WaitSettings,
    ) -> Result<()> {
        waiting::wait_till_at_least_one_host_is_in_status(
            self.client.as_ref(),
            &self.id,
            statuses,
            nodes_count,
            settings,
        )
        .await
        .context(error::WaitSnafu)
    }

    async fn wait_for_cluster(
        &self,
        statuses: &[ClusterStatus],
        break_statuses: &[ClusterStatus],
        timeout: Duration,
    ) -> Result<()> {
        waiting::wait_till_cluster_is_in_status(
            self.client.as_ref(),
            &self.id,
            statuses,
            break_statuses,
            &WaitSettings::new(timeout).interval(CLUSTER_POLL_INTERVAL),
        )
        .await
        .context(error::WaitSnafu)
    }
}
