/*!

Diagnostics gathered after a test. Every step is best-effort: a step that fails is logged and the
remaining steps still run, so one unreachable node or missing file never hides the rest.

!*/

use crate::error::{self, Result};
use crate::nodes::Nodes;
use assisted_test_model::clients::InstallerApi;
use assisted_test_model::constants::NODE_SSH_USER;
use assisted_test_model::ClusterStatus;
use log::{info, warn};
use node_controllers::{command, Node, NodeLifecycle};
use openssh::{KnownHosts, SessionBuilder};
use snafu::{ensure, ResultExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

const QEMU_LOG_DIR: &str = "/var/log/libvirt/qemu";
const MESSAGES_LOG: &str = "/var/log/messages";
const SSH_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes the diagnostics of one cluster below `log_dir`.
pub struct LogCollector<'a, A: ?Sized> {
    client: &'a A,
    log_dir: PathBuf,
}

impl<'a, A> LogCollector<'a, A>
where
    A: InstallerApi + ?Sized,
{
    pub fn new<P: Into<PathBuf>>(client: &'a A, log_dir: P) -> Self {
        Self {
            client,
            log_dir: log_dir.into(),
        }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Everything the service knows about the cluster and, when `nodes` are given, what libvirt
    /// and the nodes themselves logged.
    pub async fn collect_test_logs<C>(&self, cluster_id: &str, nodes: Option<&Nodes<C>>, failed: bool)
    where
        C: NodeLifecycle + ?Sized,
    {
        info!(
            "Collecting logs of cluster {} into '{}'",
            cluster_id,
            self.log_dir.display()
        );
        best_effort(
            "create the log folder",
            create_dir(&self.log_dir),
        )
        .await;
        self.collect_cluster_logs(cluster_id, failed).await;
        if let Some(nodes) = nodes {
            self.collect_libvirt_logs(nodes).await;
            self.collect_journalctl(nodes).await;
        }
    }

    /// Cluster details, events and, when the installation failed or finished, the installation
    /// logs tarball.
    pub async fn collect_cluster_logs(&self, cluster_id: &str, failed: bool) {
        let details = match self.client.cluster_get(cluster_id).await {
            Ok(details) => Some(details),
            Err(e) => {
                warn!("Unable to get cluster {}: {}", cluster_id, e);
                None
            }
        };
        if let Some(details) = &details {
            best_effort(
                "save cluster details",
                write_json(
                    self.log_dir
                        .join(format!("cluster_{}_metadata.json", cluster_id)),
                    details,
                ),
            )
            .await;
        }

        best_effort("save cluster events", async {
            let events = self
                .client
                .get_events(cluster_id)
                .await
                .context(error::ClientSnafu { what: "get events" })?;
            write_json(
                self.log_dir
                    .join(format!("cluster_{}_events.json", cluster_id)),
                &events,
            )
            .await
        })
        .await;

        let installed = details
            .map(|details| details.status == ClusterStatus::Installed)
            .unwrap_or_default();
        if failed || installed {
            best_effort("save installation logs", async {
                let tar = self
                    .client
                    .download_cluster_logs(cluster_id)
                    .await
                    .context(error::ClientSnafu {
                        what: "download installation logs",
                    })?;
                write(
                    self.log_dir.join(format!("cluster_{}_logs.tar", cluster_id)),
                    &tar,
                )
                .await
            })
            .await;
        }
    }

    pub async fn collect_libvirt_logs<C>(&self, nodes: &Nodes<C>)
    where
        C: NodeLifecycle + ?Sized,
    {
        info!("Collecting virsh logs");
        let libvirt_dir = self.log_dir.join("libvirt_logs");
        let qemu_dir = libvirt_dir.join("qemu_libvirt_logs");
        let console_dir = libvirt_dir.join("console_logs");
        for dir in [&libvirt_dir, &qemu_dir, &console_dir] {
            best_effort("create the libvirt log folders", create_dir(dir)).await;
        }

        best_effort(
            "save virsh list",
            save_output(libvirt_dir.join("virsh_list"), "virsh", &["list", "--all"]),
        )
        .await;
        best_effort(
            "save virsh net-list",
            save_output(
                libvirt_dir.join("virsh_net_list"),
                "virsh",
                &["net-list", "--all"],
            ),
        )
        .await;
        let network = nodes.get_cluster_network();
        best_effort(
            "save DHCP leases",
            save_output(
                libvirt_dir.join("net_dhcp_leases"),
                "virsh",
                &["net-dhcp-leases", &network],
            ),
        )
        .await;
        best_effort(
            "copy the system messages",
            copy(Path::new(MESSAGES_LOG), &libvirt_dir.join("messages.log")),
        )
        .await;

        for node in nodes.nodes() {
            let qemu_log = Path::new(QEMU_LOG_DIR).join(format!("{}.log", node.name));
            best_effort(
                "copy a qemu log",
                copy(&qemu_log, &qemu_dir.join(format!("{}-qemu.log", node.name))),
            )
            .await;
            let console_log = Path::new(QEMU_LOG_DIR).join(format!("{}-console.log", node.name));
            best_effort(
                "copy a console log",
                copy(
                    &console_log,
                    &console_dir.join(format!("{}-console.log", node.name)),
                ),
            )
            .await;
        }

        let since = nodes.setup_time();
        best_effort(
            "save the libvirtd journal",
            save_output(
                libvirt_dir.join("libvirtd_journal"),
                "journalctl",
                &["--since", &since, "-u", "libvirtd", "-D", "/run/log/journal"],
            ),
        )
        .await;
    }

    /// The journal of every node, fetched over SSH.
    pub async fn collect_journalctl<C>(&self, nodes: &Nodes<C>)
    where
        C: NodeLifecycle + ?Sized,
    {
        info!("Collecting journalctl");
        let journal_dir = self.log_dir.join("nodes_journalctl");
        best_effort("create the journal folder", create_dir(&journal_dir)).await;
        for node in nodes.nodes() {
            let result = async {
                let ip = nodes.node_ip(node).await?;
                let journal = node_journal(node, &ip).await?;
                write(journal_dir.join(&node.name), &journal).await
            }
            .await;
            if let Err(e) = result {
                info!("Could not collect journalctl for {}: {}", node.name, e);
            }
        }
    }
}

async fn best_effort<F>(what: &str, step: F)
where
    F: Future<Output = Result<()>>,
{
    if let Err(e) = step.await {
        warn!("Unable to {}: {}", what, e);
    }
}

async fn node_journal(node: &Node, ip: &str) -> Result<Vec<u8>> {
    let session = SessionBuilder::default()
        .keyfile(&node.private_ssh_key_path)
        .user(NODE_SSH_USER.to_string())
        .known_hosts_check(KnownHosts::Accept)
        .user_known_hosts_file("/dev/null")
        .connect_timeout(SSH_CONNECT_TIMEOUT)
        .connect_mux(ip)
        .await
        .context(error::SshConnectSnafu { address: ip })?;
    let output = session
        .command("sudo")
        .args(["journalctl", "--no-pager"])
        .output()
        .await
        .context(error::SshCommandSnafu {
            command: "sudo journalctl",
            address: ip,
        })?;
    if let Err(e) = session.close().await {
        warn!("Unable to close the SSH session to {}: {}", ip, e);
    }
    ensure!(
        output.status.success(),
        error::SshStatusSnafu {
            command: "sudo journalctl",
            address: ip,
            status: output.status.to_string(),
        }
    );
    Ok(output.stdout)
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .context(error::WriteSnafu { path })
}

async fn write(path: PathBuf, contents: &[u8]) -> Result<()> {
    tokio::fs::write(&path, contents)
        .await
        .context(error::WriteSnafu { path })
}

async fn write_json<T: serde::Serialize>(path: PathBuf, value: &T) -> Result<()> {
    // Round-trip through `Value` so object keys are written sorted.
    let value = serde_json::to_value(value).context(error::SerializeSnafu { what: "logs" })?;
    let contents =
        serde_json::to_vec_pretty(&value).context(error::SerializeSnafu { what: "logs" })?;
    write(path, &contents).await
}

async fn copy(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::copy(from, to)
        .await
        .context(error::WriteSnafu { path: to })?;
    Ok(())
}

async fn save_output(path: PathBuf, program: &str, args: &[&str]) -> Result<()> {
    let output = command::run(program, args)
        .await
        .context(error::ControllerSnafu {
            what: format!("run {}", program),
        })?;
    write(path, output.as_bytes()).await
}
