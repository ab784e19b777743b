/*!

Mock implementations of [`InstallerApi`] and [`NodeLifecycle`] that share one simulated world, so
scenarios can be exercised without an assisted service or a hypervisor.

The simulated service advances every time a cluster or its hosts are fetched: hosts register once
the discovery image exists and their node runs, the cluster becomes `ready` once roles and network
are set, and installing hosts reboot after a few polls. A host whose node still boots from the
cdrom at that point ends up in `installing-pending-user-action` until its node is restarted with the
disk first. After a reset, hosts wait in `resetting-pending-user-action` until their node is started
again with a wiped disk, which boots it into the discovery ISO.

!*/

pub(crate) mod controller;
pub(crate) mod installer;

use assisted_test_model::{Cluster, ClusterStatus, Host, HostStatus, NodeRole};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) const CLUSTER_ID: &str = "a1b2c3d4-0000-4000-8000-000000000001";

/// Polls an installing host spends before it reboots into its disk.
const REBOOT_AFTER: u32 = 2;
/// Polls between the reboot and `installed`.
const INSTALLED_AFTER_REBOOT: u32 = 2;

#[derive(Debug, Default)]
pub(crate) struct SimulatedHost {
    pub(crate) host: Host,
    pub(crate) progress: u32,
    pub(crate) rebooted_at: Option<u32>,
}

#[derive(Debug, Default)]
pub(crate) struct World {
    pub(crate) cluster: Option<Cluster>,
    pub(crate) hosts: BTreeMap<String, SimulatedHost>,
    pub(crate) node_names: Vec<String>,
    pub(crate) running: BTreeSet<String>,
    pub(crate) cd_first: BTreeSet<String>,
    /// Nodes whose disk was formatted since they last booted.
    pub(crate) wiped: BTreeSet<String>,
    pub(crate) image_generated: bool,
    pub(crate) network_set: bool,
    /// A host that goes to `error` as soon as it starts installing.
    pub(crate) failing_host: Option<String>,
    /// Calls that change state, in order.
    pub(crate) calls: Vec<String>,
}

impl World {
    pub(crate) fn record<S: Into<String>>(&mut self, call: S) {
        self.calls.push(call.into());
    }

    /// Advance the simulation by one poll.
    pub(crate) fn tick(&mut self) {
        let status = match &self.cluster {
            Some(cluster) => cluster.status,
            None => return,
        };
        match status {
            ClusterStatus::Insufficient | ClusterStatus::PendingForInput | ClusterStatus::Ready => {
                self.discover_hosts();
                self.check_ready();
            }
            ClusterStatus::Installing
            | ClusterStatus::InstallingPendingUserAction
            | ClusterStatus::Finalizing => {
                self.progress_installation();
            }
            _ => {}
        }
    }

    fn discover_hosts(&mut self) {
        if !self.image_generated {
            return;
        }
        for name in &self.running {
            self.hosts
                .entry(name.clone())
                .or_insert_with(|| SimulatedHost {
                    host: Host {
                        id: format!("host-{}", name),
                        requested_hostname: Some(name.clone()),
                        status: HostStatus::Known,
                        ..Default::default()
                    },
                    ..Default::default()
                });
        }
    }

    fn check_ready(&mut self) {
        let expected = self.node_names.len();
        let roles_set = self.hosts.len() == expected
            && self.hosts.values().all(|sim| {
                sim.host.status == HostStatus::Known && sim.host.role != NodeRole::AutoAssign
            });
        if let Some(cluster) = &mut self.cluster {
            cluster.status = if roles_set && self.network_set {
                ClusterStatus::Ready
            } else {
                ClusterStatus::Insufficient
            };
        }
    }

    fn progress_installation(&mut self) {
        let names: Vec<String> = self.hosts.keys().cloned().collect();
        for name in names {
            let others_installed = self
                .hosts
                .iter()
                .filter(|(other, _)| **other != name)
                .all(|(_, sim)| sim.host.status == HostStatus::Installed);
            let cd_first = self.cd_first.contains(&name);
            let failing = self.failing_host.as_deref() == Some(name.as_str());
            let sim = match self.hosts.get_mut(&name) {
                Some(sim) => sim,
                None => continue,
            };
            if sim.host.status != HostStatus::InstallingInProgress {
                continue;
            }
            sim.progress += 1;
            if failing {
                sim.host.status = HostStatus::Error;
                continue;
            }
            let rebooted_at = sim.rebooted_at;
            match rebooted_at {
                None if sim.progress >= REBOOT_AFTER && (!sim.host.bootstrap || others_installed) => {
                    if cd_first {
                        sim.host.status = HostStatus::InstallingPendingUserAction;
                    } else {
                        sim.rebooted_at = Some(sim.progress);
                    }
                }
                Some(rebooted_at) if sim.progress >= rebooted_at + INSTALLED_AFTER_REBOOT => {
                    sim.host.status = HostStatus::Installed;
                }
                _ => {}
            }
        }

        let statuses: Vec<HostStatus> = self.hosts.values().map(|sim| sim.host.status).collect();
        if let Some(cluster) = &mut self.cluster {
            cluster.status = if statuses.contains(&HostStatus::Error) {
                ClusterStatus::Error
            } else if statuses.contains(&HostStatus::InstallingPendingUserAction) {
                ClusterStatus::InstallingPendingUserAction
            } else if statuses.iter().all(|status| *status == HostStatus::Installed) {
                if cluster.status == ClusterStatus::Finalizing {
                    ClusterStatus::Installed
                } else {
                    ClusterStatus::Finalizing
                }
            } else {
                ClusterStatus::Installing
            };
        }
    }

    /// A node that was stuck on the cdrom and now boots from its disk carries on installing. A
    /// node waiting for a reboot after a reset registers again once it boots with a wiped disk.
    pub(crate) fn node_started(&mut self, name: &str) {
        self.running.insert(name.to_string());
        let wiped = self.wiped.remove(name);
        let sim = match self.hosts.get_mut(name) {
            Some(sim) => sim,
            None => return,
        };
        match sim.host.status {
            HostStatus::ResettingPendingUserAction if wiped => {
                sim.host.status = HostStatus::Known;
                sim.progress = 0;
                sim.rebooted_at = None;
            }
            HostStatus::InstallingPendingUserAction if !self.cd_first.contains(name) => {
                sim.host.status = HostStatus::InstallingInProgress;
                sim.rebooted_at = Some(sim.progress);
            }
            _ => {}
        }
    }

    pub(crate) fn cluster_with_hosts(&self) -> Option<Cluster> {
        self.cluster.clone().map(|mut cluster| {
            cluster.hosts = self.host_list();
            cluster
        })
    }

    pub(crate) fn host_list(&self) -> Vec<Host> {
        self.hosts.values().map(|sim| sim.host.clone()).collect()
    }
}

/// The world shared by the mock client and the mock controller.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedWorld(Arc<Mutex<World>>);

impl SharedWorld {
    pub(crate) fn new(node_names: &[&str]) -> Self {
        let world = World {
            node_names: node_names.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(world)))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, World> {
        self.0.lock().unwrap()
    }
}
