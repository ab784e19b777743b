use crate::command;
use crate::error::{self, Result};
use log::{info, warn};
use snafu::OptionExt;

const MARK_BASE: u32 = 555;

/// Lets the nodes of a libvirt network reach the outside world: packets coming in on the network
/// interfaces are marked, and marked packets are masqueraded on the default route interface.
#[derive(Debug, Clone)]
pub struct NatController {
    input_interfaces: Vec<String>,
    namespace_index: u32,
}

impl NatController {
    pub fn new<I, S>(input_interfaces: I, namespace_index: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input_interfaces: input_interfaces.into_iter().map(Into::into).collect(),
            namespace_index,
        }
    }

    /// The index of the network namespace a libvirt interface such as `tt3` belongs to. Interfaces
    /// without trailing digits belong to namespace 0.
    pub fn get_namespace_index(interface: &str) -> u32 {
        let prefix = interface.trim_end_matches(|c: char| c.is_ascii_digit());
        interface[prefix.len()..].parse().unwrap_or(0)
    }

    pub fn mark(&self) -> u32 {
        MARK_BASE + self.namespace_index
    }

    /// Add the rules. Stale rules from an earlier run are removed first.
    pub async fn add_nat_rules(&self) -> Result<()> {
        info!(
            "Adding nat rules for interfaces {:?}",
            self.input_interfaces
        );
        self.remove_nat_rules().await;
        let output_interface = default_interface().await?;
        for input_interface in &self.input_interfaces {
            command::run("iptables", self.mark_rule("-I", input_interface)).await?;
        }
        command::run("iptables", self.nat_rule("-I", &output_interface)).await?;
        Ok(())
    }

    /// Remove the rules, logging the ones that were not there.
    pub async fn remove_nat_rules(&self) {
        info!(
            "Removing nat rules for interfaces {:?}",
            self.input_interfaces
        );
        for input_interface in &self.input_interfaces {
            if let Err(e) = command::run("iptables", self.mark_rule("-D", input_interface)).await {
                warn!("Unable to remove mark rule of '{}': {}", input_interface, e);
            }
        }
        match default_interface().await {
            Ok(output_interface) => {
                if let Err(e) =
                    command::run("iptables", self.nat_rule("-D", &output_interface)).await
                {
                    warn!("Unable to remove masquerade rule: {}", e);
                }
            }
            Err(e) => warn!("Unable to remove masquerade rule: {}", e),
        }
    }

    fn mark_rule(&self, action: &str, input_interface: &str) -> Vec<String> {
        [
            "-t",
            "mangle",
            action,
            "PREROUTING",
            "-i",
            input_interface,
            "-j",
            "MARK",
            "--set-mark",
            self.mark().to_string().as_str(),
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    fn nat_rule(&self, action: &str, output_interface: &str) -> Vec<String> {
        [
            "-t",
            "nat",
            action,
            "POSTROUTING",
            "-m",
            "mark",
            "--mark",
            self.mark().to_string().as_str(),
            "-o",
            output_interface,
            "-j",
            "MASQUERADE",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }
}

/// The interface of the host's default route.
async fn default_interface() -> Result<String> {
    let output = command::run("ip", ["route", "show", "default"]).await?;
    parse_default_interface(&output)
}

fn parse_default_interface(output: &str) -> Result<String> {
    output
        .split_whitespace()
        .skip_while(|word| *word != "dev")
        .nth(1)
        .map(str::to_string)
        .context(error::DefaultInterfaceSnafu { output })
}

/// A filter rule that applies only to traffic from a set of source addresses, typically the IPs of
/// some nodes.
#[derive(Debug, Clone, Default)]
pub struct IptableRule {
    pub chain: String,
    pub target: String,
    pub protocol: String,
    pub dest_port: Option<u16>,
    pub sources: Vec<String>,
    pub extra_args: Vec<String>,
}

impl IptableRule {
    pub fn new<S1, S2, S3>(chain: S1, target: S2, protocol: S3, dest_port: Option<u16>) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            chain: chain.into(),
            target: target.into(),
            protocol: protocol.into(),
            dest_port,
            ..Default::default()
        }
    }

    pub fn extra_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn add_sources<I, S>(&mut self, sources: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
    }

    pub async fn insert(&self) -> Result<()> {
        info!("Inserting iptables rule {}", self.args("--insert").join(" "));
        command::run("iptables", self.args("--insert")).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<()> {
        info!("Deleting iptables rule {}", self.args("--delete").join(" "));
        command::run("iptables", self.args("--delete")).await?;
        Ok(())
    }

    fn args(&self, action: &str) -> Vec<String> {
        let mut args = vec![
            action.to_string(),
            self.chain.clone(),
            "-p".to_string(),
            self.protocol.clone(),
        ];
        if let Some(port) = self.dest_port {
            args.push("--dport".to_string());
            args.push(port.to_string());
        }
        if !self.sources.is_empty() {
            args.push("-s".to_string());
            args.push(self.sources.join(","));
        }
        args.extend(self.extra_args.iter().cloned());
        args.push("-j".to_string());
        args.push(self.target.clone());
        args
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn namespace_index() {
        assert_eq!(NatController::get_namespace_index("tt0"), 0);
        assert_eq!(NatController::get_namespace_index("tt12"), 12);
        assert_eq!(NatController::get_namespace_index("stt3"), 3);
        assert_eq!(NatController::get_namespace_index("eth"), 0);
        assert_eq!(NatController::get_namespace_index(""), 0);
        assert_eq!(NatController::get_namespace_index("netzé7"), 7);
        assert_eq!(NatController::get_namespace_index("tté"), 0);
    }

    #[test]
    fn nat_rules() {
        let nat = NatController::new(["tt1", "stt1"], 1);
        assert_eq!(nat.mark(), 556);
        assert_eq!(
            nat.mark_rule("-I", "tt1").join(" "),
            "-t mangle -I PREROUTING -i tt1 -j MARK --set-mark 556"
        );
        assert_eq!(
            nat.nat_rule("-D", "eno1").join(" "),
            "-t nat -D POSTROUTING -m mark --mark 556 -o eno1 -j MASQUERADE"
        );
    }

    #[test]
    fn default_route_interface() {
        assert_eq!(
            parse_default_interface("default via 10.0.0.1 dev eno1 proto dhcp metric 100\n")
                .unwrap(),
            "eno1"
        );
        assert!(parse_default_interface("").is_err());
    }

    #[test]
    fn rule_scoped_to_sources() {
        let mut rule = IptableRule::new("FORWARD", "DROP", "tcp", Some(80));
        rule.add_sources(["192.168.126.10", "192.168.126.11"]);
        assert_eq!(
            rule.args("--insert").join(" "),
            "--insert FORWARD -p tcp --dport 80 -s 192.168.126.10,192.168.126.11 -j DROP"
        );
        let rule = IptableRule::new("INPUT", "REJECT", "udp", None)
            .extra_args(["--reject-with", "icmp-host-prohibited"]);
        assert_eq!(
            rule.args("--delete").join(" "),
            "--delete INPUT -p udp --reject-with icmp-host-prohibited -j REJECT"
        );
    }
}
