use crate::clients::{HttpStatusCode, StatusCode};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use log::info;
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::path::Path;

const SECRET_TYPE: &str = "kubernetes.io/dockerconfigjson";
const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Unable to read kubeconfig: {}", source))]
    ConfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to create client: {}", source))]
    ClientCreateKubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to create client from the default kubeconfig: {}", source))]
    ClientCreateDefault { source: kube::Error },

    #[snafu(display("Invalid pull secret: {}", source))]
    InvalidPullSecret { source: serde_json::Error },

    #[snafu(display("Unable to {} secret '{}/{}': {}", method, namespace, name, source))]
    KubeApiCall {
        method: String,
        namespace: String,
        name: String,
        source: kube::Error,
    },
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            Error::KubeApiCall { source, .. } | Error::ClientCreateDefault { source } => {
                source.status_code()
            }
            Error::ConfigRead { .. }
            | Error::ClientCreateKubeconfig { .. }
            | Error::InvalidPullSecret { .. } => None,
        }
    }
}

/// Create a Kubernetes client from the kubeconfig at `path`, or the default one (`KUBECONFIG`,
/// `~/.kube/config` or the in-cluster config) when `path` is `None`.
pub async fn kube_client(path: Option<&Path>) -> Result<Client> {
    match path {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).context(ConfigReadSnafu)?;
            let config =
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context(ClientCreateKubeconfigSnafu)?;
            Client::try_from(config).context(ClientCreateDefaultSnafu)
        }
        None => Client::try_default().await.context(ClientCreateDefaultSnafu),
    }
}

/// The image pull secret a `ClusterDeployment` refers to.
pub struct PullSecret {
    api: Api<Secret>,
    name: String,
    namespace: String,
}

impl PullSecret {
    pub fn new<S1, S2>(client: Client, name: S1, namespace: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let namespace = namespace.into();
        Self {
            api: Api::namespaced(client, &namespace),
            name: name.into(),
            namespace,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The secret object that `create` posts.
    pub fn manifest(&self, pull_secret: &str) -> Secret {
        Secret {
            metadata: kube::api::ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            string_data: Some(BTreeMap::from([(
                DOCKER_CONFIG_JSON_KEY.to_string(),
                pull_secret.to_string(),
            )])),
            type_: Some(SECRET_TYPE.to_string()),
            ..Default::default()
        }
    }

    pub async fn create(&self, pull_secret: &str) -> Result<Secret> {
        let secret = self
            .api
            .create(&PostParams::default(), &self.manifest(pull_secret))
            .await
            .context(self.api_call("create"))?;
        info!("Created secret {}/{}", self.namespace, self.name);
        Ok(secret)
    }

    pub async fn delete(&self) -> Result<()> {
        self.api
            .delete(&self.name, &DeleteParams::default())
            .await
            .context(self.api_call("delete"))?;
        info!("Deleted secret {}/{}", self.namespace, self.name);
        Ok(())
    }

    pub async fn get(&self) -> Result<Secret> {
        self.api
            .get(&self.name)
            .await
            .context(self.api_call("get"))
    }

    fn api_call(&self, method: &str) -> KubeApiCallSnafu<String, String, String> {
        KubeApiCallSnafu {
            method: method.to_string(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Create the pull secret `name` in `namespace`. A secret that already exists is left alone when
/// `ignore_conflict` is set.
pub async fn deploy_default_secret(
    client: Client,
    name: &str,
    namespace: &str,
    pull_secret: &str,
    ignore_conflict: bool,
) -> Result<PullSecret> {
    validate_pull_secret(pull_secret)?;
    let secret = PullSecret::new(client, name, namespace);
    match secret.create(pull_secret).await {
        Ok(_) => Ok(secret),
        Err(e) if ignore_conflict && e.is_status_code(StatusCode::CONFLICT) => {
            info!("Secret {}/{} already exists", namespace, name);
            Ok(secret)
        }
        Err(e) => Err(e),
    }
}

/// An empty pull secret is accepted; anything else must be a JSON document.
pub fn validate_pull_secret(pull_secret: &str) -> Result<()> {
    if pull_secret.is_empty() {
        return Ok(());
    }
    serde_json::from_str::<serde_json::Value>(pull_secret).context(InvalidPullSecretSnafu)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pull_secret_validation() {
        assert!(validate_pull_secret("").is_ok());
        assert!(validate_pull_secret(r#"{"auths":{"quay.io":{"auth":"abc"}}}"#).is_ok());
        assert!(matches!(
            validate_pull_secret("not-json"),
            Err(Error::InvalidPullSecret { .. })
        ));
    }

    #[test]
    fn conflict_is_recognized() {
        let err = Error::KubeApiCall {
            method: "create".into(),
            namespace: "assisted-installer".into(),
            name: "pull-secret".into(),
            source: kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".into(),
                message: "already exists".into(),
                reason: "AlreadyExists".into(),
                code: 409,
            }),
        };
        assert!(err.is_status_code(StatusCode::CONFLICT));
        assert!(!Error::InvalidPullSecret {
            source: serde_json::from_str::<serde_json::Value>("x").unwrap_err()
        }
        .is_status_code(StatusCode::CONFLICT));
    }
}
