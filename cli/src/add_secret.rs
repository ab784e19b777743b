use anyhow::{Context, Result};
use assisted_test_model::secret::{deploy_default_secret, kube_client};
use assisted_test_model::EnvConfig;
use clap::Parser;
use std::path::PathBuf;

/// Create the image pull secret in a Kubernetes namespace.
#[derive(Debug, Parser)]
pub(crate) struct AddSecret {
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,

    /// Name of the secret.
    #[clap(long = "name", default_value = "pull-secret")]
    name: String,

    /// The namespace of the secret. Defaults to `NAMESPACE`.
    #[clap(long = "namespace")]
    namespace: Option<String>,

    /// Fail when the secret already exists.
    #[clap(long = "fail-on-conflict")]
    fail_on_conflict: bool,
}

impl AddSecret {
    pub(crate) async fn run(self, config: EnvConfig) -> Result<()> {
        let client = kube_client(self.kubeconfig.as_deref())
            .await
            .context("Unable to create a Kubernetes client")?;
        let namespace = self.namespace.unwrap_or_else(|| config.namespace.clone());
        deploy_default_secret(
            client,
            &self.name,
            &namespace,
            &config.pull_secret,
            !self.fail_on_conflict,
        )
        .await
        .context(format!(
            "Unable to create secret '{}' in '{}'",
            self.name, namespace
        ))?;
        println!("Secret '{}' is in namespace '{}'.", self.name, namespace);
        Ok(())
    }
}
