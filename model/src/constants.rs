use std::time::Duration;

/// Helper macro to avoid retyping the prefix shared by the names of everything this harness creates
/// (clusters, networks, secrets). When given no parameters, this returns the bare prefix. When
/// given a string literal parameter it adds `-parameter` to the end.
macro_rules! test_infra {
    () => {
        "test-infra"
    };
    ($s:literal) => {
        concat!(test_infra!(), "-", $s)
    };
}

// Naming
pub const TEST_INFRA: &str = test_infra!();
pub const CLUSTER_PREFIX: &str = test_infra!("cluster");
pub const TEST_NETWORK: &str = test_infra!("net-");
pub const TEST_SECONDARY_NETWORK: &str = test_infra!("secondary-network-");
pub const DEFAULT_NAMESPACE: &str = "assisted-installer";

// Assisted service
pub const API_PREFIX: &str = "api/assisted-install/v1";
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8090";

// Timeouts
pub const NODES_REGISTERED_TIMEOUT: Duration = Duration::from_secs(60 * 20);
pub const CLUSTER_INSTALLATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const CLUSTER_INSTALLATION_TIMEOUT_OCS: Duration = Duration::from_secs(60 * 95);
pub const START_CLUSTER_INSTALLATION_TIMEOUT: Duration = Duration::from_secs(360);
pub const INSTALLING_IN_PROGRESS_TIMEOUT: Duration = Duration::from_secs(60 * 10);
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(6 * 60);
pub const NTP_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const OCS_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const CNV_VALIDATION_TIMEOUT: Duration = Duration::from_secs(10 * 60);
pub const READY_TIMEOUT: Duration = Duration::from_secs(60 * 15);
pub const DISCONNECTED_TIMEOUT: Duration = Duration::from_secs(60 * 10);
pub const PENDING_USER_ACTION_TIMEOUT: Duration = Duration::from_secs(60 * 30);
pub const ERROR_TIMEOUT: Duration = Duration::from_secs(60 * 10);
pub const WAIT_FOR_BM_API: Duration = Duration::from_secs(900);

// Poll intervals
pub const HOSTS_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const CLUSTER_POLL_INTERVAL: Duration = Duration::from_secs(30);

// Node sizing
pub const NUMBER_OF_MASTERS: usize = 3;
pub const MASTER_CPU: u32 = 4;
pub const WORKER_CPU: u32 = 2;

// Cluster defaults
pub const DEFAULT_OPENSHIFT_VERSION: &str = "4.7";
pub const DEFAULT_ADDITIONAL_NTP_SOURCE: &str = "clock.redhat.com";
pub const DEFAULT_BASE_DNS_DOMAIN: &str = "redhat.com";
pub const DEFAULT_SERVICE_CIDR: &str = "172.30.0.0/16";
pub const DEFAULT_CLUSTER_CIDR: &str = "10.128.0.0/14";
pub const DEFAULT_MACHINE_CIDR: &str = "192.168.126.0/24";
pub const DEFAULT_HOST_PREFIX: u8 = 23;

// Paths
pub const TF_FOLDER: &str = "build/terraform";
pub const TFVARS_JSON_NAME: &str = "terraform.tfvars.json";
pub const TFSTATE_NAME: &str = "terraform.tfstate";
pub const TF_TEMPLATE_BARE_METAL_FLOW: &str = "terraform_files/baremetal";
pub const TF_TEMPLATE_NONE_PLATFORM_FLOW: &str = "terraform_files/none";
pub const TF_TEMPLATE_VSPHERE_FLOW: &str = "terraform_files/vsphere";
pub const IMAGE_FOLDER: &str = "/tmp/test_images";
pub const IMAGE_NAME: &str = "installer-image.iso";
pub const STORAGE_PATH: &str = "/var/lib/libvirt/openshift-images";
pub const SSH_KEY: &str = "ssh_key/key.pub";
pub const DEFAULT_SSH_PRIVATE_KEY_PATH: &str = "ssh_key/key";
pub const LOG_FOLDER: &str = "/tmp/assisted_test_infra_logs";
pub const DEFAULT_CLUSTER_KUBECONFIG_PATH: &str = "build/kubeconfig";

/// The user the discovery image configures for SSH access.
pub const NODE_SSH_USER: &str = "core";

/// Offset, inside the machine network, of the first of the two addresses handed out as VIPs.
pub const VIPS_OFFSET: u32 = 100;

/// Host installation progress stages as reported in `progress.current_stage`.
pub mod stages {
    pub const START_INSTALLATION: &str = "Starting installation";
    pub const INSTALLING: &str = "Installing";
    pub const WRITE_IMAGE_TO_DISK: &str = "Writing image to disk";
    pub const WAIT_FOR_CONTROL_PLANE: &str = "Waiting for control plane";
    pub const REBOOTING: &str = "Rebooting";
    pub const WAIT_FOR_IGNITION: &str = "Waiting for ignition";
    pub const JOINED: &str = "Joined";
    pub const CONFIGURING: &str = "Configuring";
    pub const DONE: &str = "Done";

    pub const ALL: [&str; 9] = [
        START_INSTALLATION,
        INSTALLING,
        WRITE_IMAGE_TO_DISK,
        WAIT_FOR_CONTROL_PLANE,
        REBOOTING,
        WAIT_FOR_IGNITION,
        CONFIGURING,
        JOINED,
        DONE,
    ];
}
