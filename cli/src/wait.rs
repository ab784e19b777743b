use crate::installer_client;
use anyhow::{Context, Result};
use assisted_test_model::constants::{CLUSTER_POLL_INTERVAL, HOSTS_POLL_INTERVAL};
use assisted_test_model::waiting::{self, WaitSettings};
use assisted_test_model::{ClusterStatus, EnvConfig, HostStatus};
use clap::Parser;
use std::time::Duration;

/// Wait until a cluster is in one of the given statuses.
#[derive(Debug, Parser)]
pub(crate) struct WaitCluster {
    /// The id of the cluster.
    #[clap(long = "cluster-id")]
    cluster_id: String,

    /// A status to wait for, e.g. `installed`. May be repeated.
    #[clap(long = "status", required = true)]
    statuses: Vec<ClusterStatus>,

    /// A status that ends the wait with a failure, e.g. `cancelled`. May be repeated.
    #[clap(long = "break-on")]
    break_statuses: Vec<ClusterStatus>,

    /// How long to wait, in seconds.
    #[clap(long, default_value = "3600")]
    timeout: u64,

    /// Seconds between two polls.
    #[clap(long)]
    interval: Option<u64>,

    /// Keep waiting when the cluster is in `error`.
    #[clap(long = "ignore-error")]
    ignore_error: bool,
}

impl WaitCluster {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = installer_client(&config)?;
        let settings = settings(
            self.timeout,
            self.interval,
            CLUSTER_POLL_INTERVAL,
            self.ignore_error,
        );
        waiting::wait_till_cluster_is_in_status(
            client.as_ref(),
            &self.cluster_id,
            &self.statuses,
            &self.break_statuses,
            &settings,
        )
        .await
        .context(format!("Cluster '{}' did not reach its status", self.cluster_id))?;
        println!("Cluster '{}' reached {:?}.", self.cluster_id, self.statuses);
        Ok(())
    }
}

/// Wait until hosts of a cluster are in one of the given statuses.
#[derive(Debug, Parser)]
pub(crate) struct WaitHosts {
    /// The id of the cluster.
    #[clap(long = "cluster-id")]
    cluster_id: String,

    /// A status to wait for, e.g. `known`. May be repeated.
    #[clap(long = "status", required = true)]
    statuses: Vec<HostStatus>,

    /// The number of hosts that must be in the status. Defaults to every node of the
    /// configuration, or to one with `--at-least`.
    #[clap(long)]
    count: Option<usize>,

    /// Succeed once `--count` hosts are in the status, whatever the other hosts do.
    #[clap(long = "at-least")]
    at_least: bool,

    /// How long to wait, in seconds.
    #[clap(long, default_value = "1200")]
    timeout: u64,

    /// Seconds between two polls.
    #[clap(long)]
    interval: Option<u64>,

    /// Keep waiting when a host is in `error`.
    #[clap(long = "ignore-error")]
    ignore_error: bool,
}

impl WaitHosts {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = installer_client(&config)?;
        let settings = settings(
            self.timeout,
            self.interval,
            HOSTS_POLL_INTERVAL,
            self.ignore_error,
        );
        let result = if self.at_least {
            let count = self.count.unwrap_or(1);
            waiting::wait_till_at_least_one_host_is_in_status(
                client.as_ref(),
                &self.cluster_id,
                &self.statuses,
                count,
                &settings,
            )
            .await
        } else {
            let count = self.count.unwrap_or_else(|| config.nodes_count());
            waiting::wait_till_all_hosts_are_in_status(
                client.as_ref(),
                &self.cluster_id,
                &self.statuses,
                count,
                &settings,
            )
            .await
        };
        result.context(format!(
            "Hosts of cluster '{}' did not reach their status",
            self.cluster_id
        ))?;
        println!(
            "Hosts of cluster '{}' reached {:?}.",
            self.cluster_id, self.statuses
        );
        Ok(())
    }
}

fn settings(
    timeout: u64,
    interval: Option<u64>,
    default_interval: Duration,
    ignore_error: bool,
) -> WaitSettings {
    WaitSettings::new(Duration::from_secs(timeout))
        .interval(
            interval
                .map(Duration::from_secs)
                .unwrap_or(default_interval),
        )
        .fall_on_error_status(!ignore_error)
}
