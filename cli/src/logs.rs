use crate::installer_client;
use anyhow::{Context, Result};
use assisted_test_model::EnvConfig;
use clap::Parser;
use node_controllers::{Terraform, TerraformController};
use std::path::PathBuf;
use std::sync::Arc;
use test_infra::{LogCollector, Nodes};

/// Collect the logs of a cluster into a folder.
#[derive(Debug, Parser)]
pub(crate) struct Logs {
    /// The id of the cluster.
    #[clap(long = "cluster-id")]
    cluster_id: String,

    /// Where the logs are written. Defaults to `LOG_FOLDER`.
    #[clap(long = "log-dir")]
    log_dir: Option<PathBuf>,

    /// Also download the installation logs of a cluster that is not installed.
    #[clap(long)]
    failed: bool,

    /// The name the cluster's nodes were provisioned under. When given, libvirt logs and the
    /// journals of the nodes are collected too.
    #[clap(long = "cluster-name")]
    cluster_name: Option<String>,
}

impl Logs {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = installer_client(&config)?;
        let log_dir = self
            .log_dir
            .clone()
            .unwrap_or_else(|| config.log_folder.clone());
        let collector = LogCollector::new(client.as_ref(), &log_dir);

        match &self.cluster_name {
            Some(cluster_name) => {
                let mut cluster_config = config.cluster_config();
                cluster_config.cluster_name = cluster_name.clone();
                let nodes_config = config.nodes_config();
                let tf = Terraform::new(nodes_config.working_dir.join(cluster_name));
                let controller =
                    TerraformController::with_terraform(nodes_config, cluster_config, tf);
                let mut nodes = Nodes::new(Arc::new(controller));
                nodes
                    .refresh()
                    .await
                    .context(format!("Unable to find the nodes of '{}'", cluster_name))?;
                collector
                    .collect_test_logs(&self.cluster_id, Some(&nodes), self.failed)
                    .await;
            }
            None => {
                collector
                    .collect_test_logs::<TerraformController>(&self.cluster_id, None, self.failed)
                    .await;
            }
        }
        println!("Logs written to '{}'.", log_dir.display());
        Ok(())
    }
}
