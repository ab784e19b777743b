use super::{Observation, Result, WaitSettings};
use crate::clients::{self, InstallerApi};
use crate::{ClusterStatus, HostStatus};
use log::{error, info};
use std::fmt::Display;

/// Wait until `nodes_count` hosts of the cluster are in one of `statuses`.
pub async fn wait_till_all_hosts_are_in_status<A>(
    client: &A,
    cluster_id: &str,
    statuses: &[HostStatus],
    nodes_count: usize,
    settings: &WaitSettings,
) -> Result<()>
where
    A: InstallerApi + ?Sized,
{
    let waiting_for = format!(
        "{} hosts of cluster {} to be in {}",
        nodes_count,
        cluster_id,
        join(statuses)
    );
    let result = super::wait_till_all_in_status(
        &waiting_for,
        statuses,
        nodes_count,
        settings,
        || host_observations(client, cluster_id),
    )
    .await;
    log_hosts(client, cluster_id).await;
    result
}

/// Wait until at least `nodes_count` hosts (usually one) of the cluster are in one of `statuses`.
pub async fn wait_till_at_least_one_host_is_in_status<A>(
    client: &A,
    cluster_id: &str,
    statuses: &[HostStatus],
    nodes_count: usize,
    settings: &WaitSettings,
) -> Result<()>
where
    A: InstallerApi + ?Sized,
{
    let waiting_for = format!(
        "at least {} hosts of cluster {} to be in {}",
        nodes_count,
        cluster_id,
        join(statuses)
    );
    let result = super::wait_till_at_least_in_status(
        &waiting_for,
        statuses,
        nodes_count,
        settings,
        || host_observations(client, cluster_id),
    )
    .await;
    log_hosts(client, cluster_id).await;
    result
}

/// Wait until the cluster is in one of `statuses`. Any of `break_statuses` aborts the wait.
pub async fn wait_till_cluster_is_in_status<A>(
    client: &A,
    cluster_id: &str,
    statuses: &[ClusterStatus],
    break_statuses: &[ClusterStatus],
    settings: &WaitSettings,
) -> Result<()>
where
    A: InstallerApi + ?Sized,
{
    let waiting_for = format!("cluster {} to be in {}", cluster_id, join(statuses));
    super::wait_till_in_status(&waiting_for, statuses, break_statuses, settings, || {
        cluster_observation(client, cluster_id)
    })
    .await
}

/// Whether the cluster is currently in one of `statuses`. A failed fetch counts as "no".
pub async fn is_cluster_in_status<A>(
    client: &A,
    cluster_id: &str,
    statuses: &[ClusterStatus],
) -> bool
where
    A: InstallerApi + ?Sized,
{
    match client.cluster_get(cluster_id).await {
        Ok(cluster) if statuses.contains(&cluster.status) => true,
        Ok(cluster) => {
            info!(
                "Cluster {} is not in {}, current status is {}",
                cluster_id,
                join(statuses),
                cluster.status
            );
            false
        }
        Err(e) => {
            error!("Failed to get cluster {}: {}", cluster_id, e);
            false
        }
    }
}

async fn host_observations<A>(
    client: &A,
    cluster_id: &str,
) -> clients::Result<Vec<Observation<HostStatus>>>
where
    A: InstallerApi + ?Sized,
{
    Ok(client
        .get_cluster_hosts(cluster_id)
        .await?
        .into_iter()
        .map(|host| Observation::new(host.name(), host.status))
        .collect())
}

async fn cluster_observation<A>(
    client: &A,
    cluster_id: &str,
) -> clients::Result<Observation<ClusterStatus>>
where
    A: InstallerApi + ?Sized,
{
    let cluster = client.cluster_get(cluster_id).await?;
    Ok(Observation::new(cluster_id, cluster.status))
}

async fn log_hosts<A>(client: &A, cluster_id: &str)
where
    A: InstallerApi + ?Sized,
{
    if let Ok(hosts) = client.get_cluster_hosts(cluster_id).await {
        let hosts: Vec<String> = hosts
            .iter()
            .map(|host| format!("{}={}", host.name(), host.status))
            .collect();
        info!("Hosts of cluster {}: [{}]", cluster_id, hosts.join(", "));
    }
}

fn join<S: Display>(statuses: &[S]) -> String {
    let statuses: Vec<String> = statuses.iter().map(ToString::to_string).collect();
    format!("[{}]", statuses.join(", "))
}
