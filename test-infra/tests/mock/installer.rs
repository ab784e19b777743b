use super::{SharedWorld, CLUSTER_ID};
use assisted_test_model::clients::{Error, InstallerApi, Result, StatusCode};
use assisted_test_model::{
    Cluster, ClusterCreateParams, ClusterStatus, ClusterUpdateParams, Event, Host, HostStatus,
    ImageCreateParams, NodeRole,
};
use bytes::Bytes;

/// An [`InstallerApi`] backed by the simulated world instead of the assisted service.
pub(crate) struct MockInstaller {
    world: SharedWorld,
}

impl MockInstaller {
    pub(crate) fn new(world: SharedWorld) -> Self {
        Self { world }
    }
}

fn not_found(method: &str, cluster_id: &str) -> Error {
    Error::new_with_status(
        method,
        format!("/api/assisted-install/v1/clusters/{}", cluster_id),
        StatusCode::NOT_FOUND,
        "cluster not found",
    )
}

fn conflict(method: &str, cluster_id: &str, status: ClusterStatus) -> Error {
    Error::new_with_status(
        method,
        format!("/api/assisted-install/v1/clusters/{}", cluster_id),
        StatusCode::CONFLICT,
        format!("cluster is in status {}", status),
    )
}

#[async_trait::async_trait]
impl InstallerApi for MockInstaller {
    async fn create_cluster(&self, params: &ClusterCreateParams) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.record(format!("create_cluster {}", params.name));
        let cluster = Cluster {
            id: CLUSTER_ID.to_string(),
            name: params.name.clone(),
            status: ClusterStatus::Insufficient,
            openshift_version: Some(params.openshift_version.clone()),
            vip_dhcp_allocation: Some(params.vip_dhcp_allocation),
            ..Default::default()
        };
        world.cluster = Some(cluster.clone());
        Ok(cluster)
    }

    async fn clusters_list(&self) -> Result<Vec<Cluster>> {
        Ok(self.world.lock().cluster_with_hosts().into_iter().collect())
    }

    async fn cluster_get(&self, cluster_id: &str) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.tick();
        world
            .cluster_with_hosts()
            .filter(|cluster| cluster.id == cluster_id)
            .ok_or_else(|| not_found("GET", cluster_id))
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()> {
        let mut world = self.world.lock();
        world.record("delete_cluster");
        match world.cluster.take() {
            Some(_) => Ok(()),
            None => Err(not_found("DELETE", cluster_id)),
        }
    }

    async fn update_cluster(
        &self,
        cluster_id: &str,
        params: &ClusterUpdateParams,
    ) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.record("update_cluster");
        for update in &params.hosts_roles {
            if let Some(sim) = world
                .hosts
                .values_mut()
                .find(|sim| sim.host.id == update.id)
            {
                sim.host.role = update.role;
            }
        }
        // The first master by name is picked as bootstrap.
        let bootstrap = world
            .hosts
            .iter()
            .find(|(_, sim)| sim.host.role == NodeRole::Master)
            .map(|(name, _)| name.clone());
        for (name, sim) in world.hosts.iter_mut() {
            sim.host.bootstrap = Some(name) == bootstrap.as_ref();
        }
        if params.machine_network_cidr.is_some() || params.api_vip.is_some() {
            world.network_set = true;
        }
        let cluster = world
            .cluster
            .as_mut()
            .ok_or_else(|| not_found("PATCH", cluster_id))?;
        if let Some(api_vip) = &params.api_vip {
            cluster.api_vip = Some(api_vip.clone());
        }
        if let Some(ingress_vip) = &params.ingress_vip {
            cluster.ingress_vip = Some(ingress_vip.clone());
        }
        if let Some(cidr) = &params.machine_network_cidr {
            cluster.machine_network_cidr = Some(cidr.clone());
        }
        Ok(cluster.clone())
    }

    async fn install_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.record("install_cluster");
        let cluster = world
            .cluster
            .as_mut()
            .ok_or_else(|| not_found("POST", cluster_id))?;
        if cluster.status != ClusterStatus::Ready {
            return Err(conflict("POST", cluster_id, cluster.status));
        }
        cluster.status = ClusterStatus::Installing;
        let cluster = cluster.clone();
        for sim in world.hosts.values_mut() {
            sim.host.status = HostStatus::InstallingInProgress;
        }
        Ok(cluster)
    }

    async fn cancel_cluster_install(&self, cluster_id: &str) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.record("cancel_cluster_install");
        let cluster = world
            .cluster
            .as_mut()
            .ok_or_else(|| not_found("POST", cluster_id))?;
        cluster.status = ClusterStatus::Cancelled;
        let cluster = cluster.clone();
        for sim in world.hosts.values_mut() {
            sim.host.status = HostStatus::Error;
        }
        Ok(cluster)
    }

    async fn reset_cluster_install(&self, cluster_id: &str) -> Result<Cluster> {
        let mut world = self.world.lock();
        world.record("reset_cluster_install");
        let cluster = world
            .cluster
            .as_mut()
            .ok_or_else(|| not_found("POST", cluster_id))?;
        cluster.status = ClusterStatus::Insufficient;
        let cluster = cluster.clone();
        for sim in world.hosts.values_mut() {
            sim.host.status = HostStatus::ResettingPendingUserAction;
        }
        Ok(cluster)
    }

    async fn get_cluster_hosts(&self, cluster_id: &str) -> Result<Vec<Host>> {
        let mut world = self.world.lock();
        world.tick();
        match &world.cluster {
            Some(cluster) if cluster.id == cluster_id => Ok(world.host_list()),
            _ => Err(not_found("GET", cluster_id)),
        }
    }

    async fn generate_image(&self, cluster_id: &str, _params: &ImageCreateParams) -> Result<()> {
        let mut world = self.world.lock();
        world.record("generate_image");
        if world.cluster.is_none() {
            return Err(not_found("POST", cluster_id));
        }
        world.image_generated = true;
        Ok(())
    }

    async fn download_image(&self, _cluster_id: &str) -> Result<Bytes> {
        Ok(Bytes::from_static(b"discovery iso"))
    }

    async fn download_cluster_logs(&self, _cluster_id: &str) -> Result<Bytes> {
        Ok(Bytes::from_static(b"installation logs"))
    }

    async fn get_events(&self, cluster_id: &str) -> Result<Vec<Event>> {
        Ok(vec![Event {
            cluster_id: Some(cluster_id.to_string()),
            severity: "info".to_string(),
            message: "Registered cluster".to_string(),
            ..Default::default()
        }])
    }

    async fn download_kubeconfig(&self, _cluster_id: &str, _no_ingress: bool) -> Result<Bytes> {
        Ok(Bytes::from_static(b"apiVersion: v1\nkind: Config\n"))
    }
}
