use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A virtual machine provisioned for a cluster. Operations on it go through its controller.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub private_ssh_key_path: PathBuf,
}

impl Node {
    pub fn new<S: Into<String>>(name: S, private_ssh_key_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            private_ssh_key_path,
        }
    }

    /// Node names carry their role, e.g. `test-infra-cluster-1a2b-master-0`.
    pub fn is_master(&self) -> bool {
        self.name.contains("master")
    }

    pub fn is_worker(&self) -> bool {
        self.name.contains("worker")
    }
}

/// A block device of a node, as listed by `virsh domblklist --details`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    /// `file`, `block`, ...
    pub disk_type: String,
    /// `disk` or `cdrom`.
    pub device: String,
    pub target: String,
    /// `None` for an empty drive.
    pub source: Option<String>,
}

impl Disk {
    pub fn is_cdrom(&self) -> bool {
        self.device == "cdrom"
    }

    pub fn is_disk(&self) -> bool {
        self.device == "disk"
    }

    /// Parse the table printed by `virsh domblklist <domain> --details`.
    pub fn parse_domblklist(output: &str) -> Vec<Disk> {
        output
            .lines()
            .map(str::split_whitespace)
            .filter_map(|mut columns| {
                let disk_type = columns.next()?;
                let device = columns.next()?;
                let target = columns.next()?;
                let source = columns.next()?;
                if disk_type == "Type" || disk_type.starts_with('-') {
                    return None;
                }
                Some(Disk {
                    disk_type: disk_type.to_string(),
                    device: device.to_string(),
                    target: target.to_string(),
                    source: Some(source.to_string()).filter(|source| source != "-"),
                })
            })
            .collect()
    }
}

/// The addresses a node's interfaces got from the network's DHCP server.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeAddresses {
    pub ips: Vec<String>,
    pub macs: Vec<String>,
}

impl NodeAddresses {
    /// Parse the table printed by `virsh domifaddr <domain>`. Addresses lose their prefix length.
    pub fn parse_domifaddr(output: &str) -> Self {
        let mut addresses = Self::default();
        for line in output.lines() {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 || columns[0] == "Name" || columns[0].starts_with('-') {
                continue;
            }
            let mac = columns[1].to_string();
            if !addresses.macs.contains(&mac) {
                addresses.macs.push(mac);
            }
            let ip = columns[3].split('/').next().unwrap_or_default();
            addresses.ips.push(ip.to_string());
        }
        addresses
    }
}

/// The virtual IPs of the cluster API and ingress.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Vips {
    pub api_vip: String,
    pub ingress_vip: String,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn domblklist() {
        let output = r#" Type   Device   Target   Source
------------------------------------------------------------------------
 file   disk     vda      /var/lib/libvirt/openshift-images/test-infra-cluster-master-0
 file   cdrom    sda      /tmp/test_images/installer-image.iso
 file   cdrom    sdb      -
"#;
        let disks = Disk::parse_domblklist(output);
        assert_eq!(disks.len(), 3);
        assert!(disks[0].is_disk());
        assert_eq!(disks[0].target, "vda");
        assert!(disks[1].is_cdrom());
        assert_eq!(
            disks[1].source.as_deref(),
            Some("/tmp/test_images/installer-image.iso")
        );
        assert_eq!(disks[2].source, None);
    }

    #[test]
    fn domifaddr() {
        let output = r#" Name       MAC address          Protocol     Address
-------------------------------------------------------------------------------
 vnet0      52:54:00:0e:3b:2a    ipv4         192.168.126.10/24
 vnet1      52:54:00:5c:11:0f    ipv4         192.168.140.10/24
"#;
        let addresses = NodeAddresses::parse_domifaddr(output);
        assert_eq!(addresses.ips, vec!["192.168.126.10", "192.168.140.10"]);
        assert_eq!(
            addresses.macs,
            vec!["52:54:00:0e:3b:2a", "52:54:00:5c:11:0f"]
        );
        assert_eq!(NodeAddresses::parse_domifaddr(""), NodeAddresses::default());
    }

    #[test]
    fn roles_from_names() {
        let master = Node::new("test-infra-cluster-1a2b-master-0", PathBuf::new());
        let worker = Node::new("test-infra-cluster-1a2b-worker-1", PathBuf::new());
        assert!(master.is_master() && !master.is_worker());
        assert!(worker.is_worker() && !worker.is_master());
    }
}
