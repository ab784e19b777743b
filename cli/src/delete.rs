use crate::installer_client;
use anyhow::{Context, Result};
use assisted_test_model::clients::InstallerApi;
use assisted_test_model::{ClusterStatus, EnvConfig};
use clap::Parser;
use log::info;

/// Delete a cluster from the service.
#[derive(Debug, Parser)]
pub(crate) struct Delete {
    /// The id of the cluster.
    #[clap(long = "cluster-id")]
    cluster_id: String,

    /// Cancel the installation first if the cluster is installing.
    #[clap(long)]
    cancel: bool,
}

impl Delete {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = installer_client(&config)?;
        if self.cancel {
            let cluster = client
                .cluster_get(&self.cluster_id)
                .await
                .context(format!("Unable to get cluster '{}'", self.cluster_id))?;
            if matches!(
                cluster.status,
                ClusterStatus::Installing | ClusterStatus::Finalizing
            ) {
                info!("Cancelling the installation of {}", self.cluster_id);
                client
                    .cancel_cluster_install(&self.cluster_id)
                    .await
                    .context(format!("Unable to cancel cluster '{}'", self.cluster_id))?;
            }
        }
        client
            .delete_cluster(&self.cluster_id)
            .await
            .context(format!("Unable to delete cluster '{}'", self.cluster_id))?;
        println!("Deleted cluster '{}'.", self.cluster_id);
        Ok(())
    }
}
