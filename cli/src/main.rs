/*!

This is the command line interface for running assisted installer end-to-end scenarios and for
waiting on, inspecting and cleaning up the clusters they create.

!*/

mod add_secret;
mod delete;
mod install;
mod logs;
mod status;
mod wait;

use anyhow::{Context, Result};
use assisted_test_model::clients::InstallerClient;
use assisted_test_model::EnvConfig;
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::sync::Arc;

/// Run end-to-end tests against the assisted installer service.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// The assisted service URL. Overrides `REMOTE_SERVICE_URL`.
    #[clap(long = "service-url")]
    service_url: Option<String>,
    /// The offline token sent to the service. Overrides `OFFLINE_TOKEN`.
    #[clap(long = "offline-token")]
    offline_token: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Provision nodes and install a cluster on them.
    Install(install::Install),
    /// Install a cluster whose nodes boot from the discovery image after it was written to disk.
    WrongBootOrder(install::WrongBootOrder),
    /// Wait for a cluster to reach a status.
    WaitCluster(wait::WaitCluster),
    /// Wait for the hosts of a cluster to reach a status.
    WaitHosts(wait::WaitHosts),
    /// Show clusters and their hosts.
    Status(status::Status),
    /// Collect the logs of a cluster.
    Logs(logs::Logs),
    /// Delete a cluster.
    Delete(delete::Delete),
    /// Add the pull secret to a Kubernetes cluster.
    AddSecret(add_secret::AddSecret),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = EnvConfig::from_env().context("Unable to read the configuration")?;
    if let Some(service_url) = args.service_url {
        config.remote_service_url = service_url;
    }
    if args.offline_token.is_some() {
        config.offline_token = args.offline_token;
    }
    match args.command {
        Command::Install(install) => install.run(config).await,
        Command::WrongBootOrder(wrong_boot_order) => wrong_boot_order.run(config).await,
        Command::WaitCluster(wait_cluster) => wait_cluster.run(config).await,
        Command::WaitHosts(wait_hosts) => wait_hosts.run(config).await,
        Command::Status(status) => status.run(config).await,
        Command::Logs(logs) => logs.run(config).await,
        Command::Delete(delete) => delete.run(config).await,
        Command::AddSecret(add_secret) => add_secret.run(config).await,
    }
}

/// Create the REST client for the service named by `config`.
pub(crate) fn installer_client(config: &EnvConfig) -> Result<Arc<InstallerClient>> {
    let client = InstallerClient::new(&config.remote_service_url, config.offline_token.clone())
        .context(format!(
            "Unable to create a client for '{}'",
            config.remote_service_url
        ))?;
    Ok(Arc::new(client))
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; log this binary and the harness libraries at `level`.
            let mut builder = Builder::new();
            for target in [
                env!("CARGO_CRATE_NAME"),
                "assisted_test_model",
                "node_controllers",
                "test_infra",
            ] {
                builder.filter(Some(target), level);
            }
            builder.init();
        }
    }
}
