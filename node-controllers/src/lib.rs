/*!

`node-controllers` creates, powers and destroys the machines an assisted installer cluster is
installed on. Terraform provisions the machines; the libvirt backend additionally drives them with
`virsh` and `qemu-img`. NAT and iptables rules for the test networks live here too.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use error::{Error, Result};
pub use libvirt::TerraformController;
pub use nat::{IptableRule, NatController};
pub use node::{Disk, Node, NodeAddresses, Vips};
pub use provisioner::{NodeLifecycle, NodeProvisioner};
pub use terraform::Terraform;
pub use vsphere::VSphereController;

pub mod command;
pub mod error;
mod libvirt;
mod nat;
mod node;
mod provisioner;
pub mod terraform;
mod vsphere;
