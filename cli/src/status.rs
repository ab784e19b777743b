use crate::installer_client;
use anyhow::{Context, Result};
use assisted_test_model::clients::InstallerApi;
use assisted_test_model::{ClusterReport, EnvConfig};
use clap::Parser;
use terminal_size::{Height, Width};

/// Show a cluster and its hosts, or every cluster the service knows.
#[derive(Debug, Parser)]
pub(crate) struct Status {
    /// The id of the cluster. All clusters are shown when omitted.
    #[clap(long = "cluster-id")]
    cluster_id: Option<String>,

    /// Output the results in JSON format.
    #[clap(long = "json")]
    json: bool,
}

impl Status {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = installer_client(&config)?;
        let clusters = match &self.cluster_id {
            Some(cluster_id) => vec![client
                .cluster_get(cluster_id)
                .await
                .context(format!("Unable to get cluster '{}'", cluster_id))?],
            None => client
                .clusters_list()
                .await
                .context("Unable to list clusters")?,
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&clusters)
                    .context("Could not create string from status.")?
            );
            return Ok(());
        }

        let (terminal_size::Width(width), _) =
            terminal_size::terminal_size().unwrap_or((Width(120), Height(0)));
        for cluster in clusters {
            let hosts = client
                .get_cluster_hosts(&cluster.id)
                .await
                .context(format!("Unable to get the hosts of cluster '{}'", cluster.id))?;
            println!("{}", ClusterReport::new(cluster, hosts).to_string(width as usize));
        }
        Ok(())
    }
}
