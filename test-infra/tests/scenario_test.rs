pub(crate) mod mock;

use assisted_test_model::{ClusterConfig, HostStatus};
use mock::controller::MockController;
use mock::installer::MockInstaller;
use mock::{SharedWorld, CLUSTER_ID};
use std::path::Path;
use std::sync::Arc;
use test_infra::{Cluster, Scenario, TestEnvironment, TestSettings};

const NODES: &[&str] = &["test-master-0", "test-master-1", "test-worker-0"];

fn cluster_config(dir: &Path) -> ClusterConfig {
    ClusterConfig {
        cluster_name: "test-cluster".to_string(),
        machine_cidr: "192.168.127.0/24".to_string(),
        iso_download_path: dir.join("images").join("discovery.iso"),
        ..Default::default()
    }
}

fn settings(dir: &Path, test_teardown: bool) -> TestSettings {
    TestSettings {
        test_teardown,
        log_folder: dir.join("logs"),
        collect_node_logs: false,
        kubeconfig_path: None,
    }
}

fn environment(
    world: &SharedWorld,
    dir: &Path,
    test_teardown: bool,
) -> TestEnvironment<MockInstaller, MockController> {
    TestEnvironment::new(
        Arc::new(MockInstaller::new(world.clone())),
        Arc::new(MockController::new(world.clone())),
        cluster_config(dir),
        settings(dir, test_teardown),
    )
}

fn called(world: &SharedWorld, call: &str) -> bool {
    world.lock().calls.iter().any(|recorded| recorded == call)
}

/// Installs a three node cluster and tears it down again. No logs are collected for a passing run.
#[tokio::test(start_paused = true)]
async fn install_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let mut env = environment(&world, dir.path(), true);

    env.run(Scenario::Install).await.unwrap();

    assert!(dir.path().join("images").join("discovery.iso").is_file());
    assert!(called(&world, "install_cluster"));
    assert!(called(&world, "delete_cluster"));
    assert!(called(&world, "destroy_all_nodes"));
    assert!(!called(&world, "cancel_cluster_install"));
    assert!(!dir.path().join("logs").exists());
    assert!(world.lock().cluster.is_none());
}

/// A host in `error` aborts the wait instead of letting it run into its timeout, and the logs of
/// the failed run end up in a folder named after the scenario.
#[tokio::test(start_paused = true)]
async fn host_error_fails_fast_and_collects_logs() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    world.lock().failing_host = Some("test-worker-0".to_string());
    let mut env = environment(&world, dir.path(), true);

    let err = env.run(Scenario::Install).await.unwrap_err();

    assert!(
        err.wait_error()
            .map(|e| e.is_unexpected_status())
            .unwrap_or_default(),
        "unexpected error: {}",
        err
    );
    let log_dir = dir.path().join("logs").join(Scenario::Install.name());
    for file in ["metadata.json", "events.json", "logs.tar"] {
        let path = log_dir.join(format!("cluster_{}_{}", CLUSTER_ID, file));
        assert!(path.is_file(), "missing '{}'", path.display());
    }
    let events = std::fs::read_to_string(log_dir.join(format!("cluster_{}_events.json", CLUSTER_ID)))
        .unwrap();
    assert!(events.contains("Registered cluster"));
    assert!(called(&world, "delete_cluster"));
    assert!(!called(&world, "cancel_cluster_install"));
    assert!(called(&world, "destroy_all_nodes"));
}

/// The first node keeps booting from the cdrom, gets stuck, and finishes once its boot order is
/// fixed.
#[tokio::test(start_paused = true)]
async fn wrong_boot_order_one_node() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let mut env = environment(&world, dir.path(), true);

    env.run(Scenario::WrongBootOrderOneNode).await.unwrap();

    let calls = world.lock().calls.clone();
    let stuck = calls
        .iter()
        .position(|call| call == "set_boot_order test-master-0 true")
        .unwrap();
    let fixed = calls
        .iter()
        .position(|call| call == "set_boot_order test-master-0 false")
        .unwrap();
    let install = calls
        .iter()
        .position(|call| call == "install_cluster")
        .unwrap();
    assert!(stuck < install && install < fixed);
    assert!(!dir.path().join("logs").exists());
}

/// Every node boots from the cdrom. The bootstrap node is fixed last, after the other nodes have
/// rebooted into their disks.
#[tokio::test(start_paused = true)]
async fn wrong_boot_order_all_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let mut env = environment(&world, dir.path(), true);

    env.run(Scenario::WrongBootOrderAllNodes).await.unwrap();

    let calls = world.lock().calls.clone();
    let fixes: Vec<&str> = calls
        .iter()
        .filter(|call| call.starts_with("set_boot_order") && call.ends_with("false"))
        .map(String::as_str)
        .collect();
    assert_eq!(fixes.len(), NODES.len());
    assert_eq!(fixes.last(), Some(&"set_boot_order test-master-0 false"));
}

/// Every node boots from the cdrom. The stuck installation is cancelled and reset, and the nodes
/// register again after booting the discovery ISO from wiped disks.
#[tokio::test(start_paused = true)]
async fn reset_cancel_from_wrong_boot_order() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let mut env = environment(&world, dir.path(), true);

    env.run(Scenario::ResetCancelFromWrongBootOrder)
        .await
        .unwrap();

    let calls = world.lock().calls.clone();
    let position = |wanted: &str| calls.iter().position(|call| call == wanted).unwrap();
    let cancel = position("cancel_cluster_install");
    let reset = position("reset_cluster_install");
    assert!(position("install_cluster") < cancel);
    assert!(cancel < reset);
    for node in NODES {
        let fixed = position(format!("set_boot_order {} false", node).as_str());
        let formatted = position(format!("format_node_disk {} 0", node).as_str());
        assert!(reset < fixed && fixed < formatted);
    }
    assert!(!dir.path().join("logs").exists());
    assert!(called(&world, "delete_cluster"));
}

/// A failed host takes the cluster to `error`, and a reset brings it back to `insufficient`.
#[tokio::test(start_paused = true)]
async fn reset_after_host_error() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    world.lock().failing_host = Some("test-master-1".to_string());
    let controller = MockController::new(world.clone());
    let cluster = Cluster::create(
        Arc::new(MockInstaller::new(world.clone())),
        cluster_config(dir.path()),
    )
    .await
    .unwrap();

    cluster.prepare_for_install(&controller, NODES.len()).await.unwrap();
    cluster.start_install().await.unwrap();
    cluster
        .wait_for_node_status(&[HostStatus::Error], 1)
        .await
        .unwrap();
    cluster.wait_for_cluster_in_error_status().await.unwrap();

    cluster.reset_install().await.unwrap();
    assert!(cluster.is_in_insufficient_status().await);
    let pending = cluster.get_reboot_required_nodes().await.unwrap();
    assert_eq!(pending.len(), NODES.len());
}

#[tokio::test(start_paused = true)]
async fn kubeconfig_is_saved_after_install() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let kubeconfig = dir.path().join("kubeconfig");
    let mut env = TestEnvironment::new(
        Arc::new(MockInstaller::new(world.clone())),
        Arc::new(MockController::new(world.clone())),
        cluster_config(dir.path()),
        TestSettings {
            kubeconfig_path: Some(kubeconfig.clone()),
            ..settings(dir.path(), true)
        },
    );

    env.run(Scenario::Install).await.unwrap();

    let contents = std::fs::read_to_string(&kubeconfig).unwrap();
    assert!(contents.contains("kind: Config"));
}

#[tokio::test(start_paused = true)]
async fn teardown_can_be_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let mut env = environment(&world, dir.path(), false);

    env.run(Scenario::Install).await.unwrap();

    assert!(!called(&world, "delete_cluster"));
    assert!(!called(&world, "destroy_all_nodes"));
    assert!(world.lock().cluster.is_some());
}

/// `cancelled` ends the wait for `installed` right away.
#[tokio::test(start_paused = true)]
async fn cancelled_cluster_breaks_install_wait() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let client = Arc::new(MockInstaller::new(world.clone()));
    let cluster = Cluster::create(client, cluster_config(dir.path()))
        .await
        .unwrap();
    assert_eq!(cluster.id(), CLUSTER_ID);

    cluster.cancel_install().await.unwrap();
    assert!(cluster.is_in_cancelled_status().await);
    let err = cluster
        .wait_for_install(std::time::Duration::from_secs(3600))
        .await
        .unwrap_err();
    assert!(err.wait_error().unwrap().is_unexpected_status());
}

/// Hosts get their role from their name, and the first master becomes the bootstrap.
#[tokio::test(start_paused = true)]
async fn roles_follow_host_names() {
    let dir = tempfile::tempdir().unwrap();
    let world = SharedWorld::new(NODES);
    let controller = MockController::new(world.clone());
    let cluster = Cluster::create(
        Arc::new(MockInstaller::new(world.clone())),
        cluster_config(dir.path()),
    )
    .await
    .unwrap();

    cluster.prepare_for_install(&controller, NODES.len()).await.unwrap();

    assert_eq!(
        cluster.get_bootstrap_hostname().await.unwrap(),
        "test-master-0"
    );
    let masters = cluster
        .get_nodes_by_role(assisted_test_model::NodeRole::Master)
        .await
        .unwrap();
    assert_eq!(masters.len(), 2);
    let report = cluster.report().await.unwrap();
    assert_eq!(report.hosts().len(), NODES.len());
    let details = cluster.details().await.unwrap();
    assert_eq!(details.api_vip.as_deref(), Some("192.168.127.100"));
}
