use crate::installer_client;
use anyhow::{Context, Error, Result};
use assisted_test_model::{EnvConfig, Platform};
use clap::Parser;
use log::{info, warn};
use node_controllers::{NatController, TerraformController, VSphereController};
use std::path::PathBuf;
use std::sync::Arc;
use test_infra::{Cluster, LogCollector, Nodes, Scenario, TestEnvironment, TestSettings};

/// Options shared by every scenario subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ScenarioOptions {
    /// Keep the cluster and the nodes after the run. Overrides `TEST_TEARDOWN`.
    #[clap(long = "no-teardown")]
    no_teardown: bool,

    /// Where logs of a failed run are written. Overrides `LOG_FOLDER`.
    #[clap(long = "log-folder")]
    log_folder: Option<PathBuf>,

    /// Write the kubeconfig of the installed cluster to this file.
    #[clap(long = "kubeconfig-out")]
    kubeconfig_out: Option<PathBuf>,
}

impl ScenarioOptions {
    fn settings(&self, config: &EnvConfig) -> TestSettings {
        let mut settings = TestSettings::from(config);
        if self.no_teardown {
            settings.test_teardown = false;
        }
        if let Some(log_folder) = &self.log_folder {
            settings.log_folder = log_folder.clone();
        }
        settings.kubeconfig_path = self.kubeconfig_out.clone();
        settings
    }
}

/// Install a cluster on freshly provisioned nodes.
#[derive(Debug, Parser)]
pub(crate) struct Install {
    #[clap(flatten)]
    options: ScenarioOptions,
}

impl Install {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let settings = self.options.settings(&config);
        match config.platform {
            Platform::Vsphere => install_on_vsphere(&config, settings).await,
            Platform::Baremetal | Platform::None => {
                run_on_libvirt(&config, settings, Scenario::Install).await
            }
        }
    }
}

/// Install a cluster whose nodes boot from the cdrom first, fixing their boot order once they
/// wait for it.
#[derive(Debug, Parser)]
pub(crate) struct WrongBootOrder {
    /// Give every node the wrong boot order instead of only the first one.
    #[clap(long = "all-nodes")]
    all_nodes: bool,

    /// Cancel and reset the stuck installation instead of fixing the boot order, then wait for
    /// the cluster to be ready again. Implies `--all-nodes`.
    #[clap(long = "cancel-and-reset")]
    cancel_and_reset: bool,

    #[clap(flatten)]
    options: ScenarioOptions,
}

impl WrongBootOrder {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        if config.platform == Platform::Vsphere {
            return Err(Error::msg(
                "The boot order of vSphere VMs cannot be changed, use a libvirt platform.",
            ));
        }
        let scenario = if self.cancel_and_reset {
            Scenario::ResetCancelFromWrongBootOrder
        } else if self.all_nodes {
            Scenario::WrongBootOrderAllNodes
        } else {
            Scenario::WrongBootOrderOneNode
        };
        run_on_libvirt(&config, self.options.settings(&config), scenario).await
    }
}

async fn run_on_libvirt(config: &EnvConfig, settings: TestSettings, scenario: Scenario) -> Result<()> {
    let client = installer_client(config)?;
    let cluster_config = config.cluster_config();
    let nodes_config = config.nodes_config();
    let nat = NatController::new(
        [
            nodes_config.libvirt_network_if.clone(),
            nodes_config.libvirt_secondary_network_if.clone(),
        ],
        NatController::get_namespace_index(&nodes_config.libvirt_network_if),
    );
    let controller = TerraformController::new(nodes_config, cluster_config.clone())
        .await
        .context("Unable to prepare the terraform folder")?;

    let mut env = TestEnvironment::new(client, Arc::new(controller), cluster_config, settings)
        .with_nat(nat);
    env.run(scenario)
        .await
        .context(format!("Scenario '{}' failed", scenario))?;
    println!("Scenario '{}' passed.", scenario);
    Ok(())
}

/// vSphere VMs cannot be powered individually, so the install runs without a `TestEnvironment`.
async fn install_on_vsphere(config: &EnvConfig, settings: TestSettings) -> Result<()> {
    let client = installer_client(config)?;
    let cluster_config = config.cluster_config();
    let controller = VSphereController::new(
        config.nodes_config(),
        cluster_config.clone(),
        config.vsphere_config(),
    )
    .await
    .context("Unable to prepare the terraform folder")?;
    let mut nodes = Nodes::new(Arc::new(controller));
    nodes
        .prepare_nodes()
        .await
        .context("Unable to create the VMs")?;

    let cluster = Cluster::create(Arc::clone(&client), cluster_config)
        .await
        .context("Unable to create the cluster")?;
    let result = async {
        cluster
            .prepare_for_install_on_vsphere(nodes.controller(), nodes.len())
            .await?;
        cluster.start_install_and_wait_for_installed(nodes.len()).await?;
        if let Some(path) = &settings.kubeconfig_path {
            cluster.download_kubeconfig(path, false).await?;
        }
        Ok::<(), test_infra::Error>(())
    }
    .await;

    if result.is_err() {
        LogCollector::new(
            client.as_ref(),
            settings.log_folder.join(Scenario::Install.name()),
        )
        .collect_test_logs::<TerraformController>(cluster.id(), None, true)
        .await;
    }
    if settings.test_teardown {
        info!("Deleting cluster {} and its VMs", cluster.id());
        if let Err(e) = cluster.delete().await {
            warn!("Unable to delete cluster {}: {}", cluster.id(), e);
        }
        if let Err(e) = nodes.destroy_all_nodes().await {
            warn!("Unable to destroy the VMs: {}", e);
        }
    }
    result.context("Installation on vSphere failed")?;
    println!("Cluster {} installed.", cluster.id());
    Ok(())
}
