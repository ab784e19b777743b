use super::error::{self, Result};
use crate::cluster::{
    Cluster, ClusterCreateParams, ClusterUpdateParams, Event, Host, ImageCreateParams,
};
use crate::constants::API_PREFIX;
use crate::{HostStatus, ImageType};
use bytes::Bytes;
use log::{debug, info};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use snafu::ResultExt;
use std::path::Path;
use url::Url;

/// The operations this harness performs against the assisted service REST API. Everything the
/// harness knows about clusters and hosts comes through here.
#[async_trait::async_trait]
pub trait InstallerApi: Send + Sync {
    async fn create_cluster(&self, params: &ClusterCreateParams) -> Result<Cluster>;

    async fn clusters_list(&self) -> Result<Vec<Cluster>>;

    async fn cluster_get(&self, cluster_id: &str) -> Result<Cluster>;

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()>;

    async fn update_cluster(
        &self,
        cluster_id: &str,
        params: &ClusterUpdateParams,
    ) -> Result<Cluster>;

    async fn install_cluster(&self, cluster_id: &str) -> Result<Cluster>;

    async fn cancel_cluster_install(&self, cluster_id: &str) -> Result<Cluster>;

    async fn reset_cluster_install(&self, cluster_id: &str) -> Result<Cluster>;

    async fn get_cluster_hosts(&self, cluster_id: &str) -> Result<Vec<Host>>;

    async fn generate_image(&self, cluster_id: &str, params: &ImageCreateParams) -> Result<()>;

    async fn download_image(&self, cluster_id: &str) -> Result<Bytes>;

    /// The installation logs tarball of the cluster and all of its hosts.
    async fn download_cluster_logs(&self, cluster_id: &str) -> Result<Bytes>;

    async fn get_events(&self, cluster_id: &str) -> Result<Vec<Event>>;

    /// Either `kubeconfig` or, when `no_ingress` is set, `kubeconfig-noingress` (available
    /// before the ingress is up).
    async fn download_kubeconfig(&self, cluster_id: &str, no_ingress: bool) -> Result<Bytes>;

    async fn get_hosts_in_statuses(
        &self,
        cluster_id: &str,
        statuses: &[HostStatus],
    ) -> Result<Vec<Host>> {
        Ok(self
            .get_cluster_hosts(cluster_id)
            .await?
            .into_iter()
            .filter(|host| statuses.contains(&host.status))
            .collect())
    }

    /// Generate the discovery image and save it to `image_path`.
    async fn generate_and_download_image(
        &self,
        cluster_id: &str,
        ssh_key: Option<&str>,
        image_type: ImageType,
        image_path: &Path,
    ) -> Result<()> {
        self.generate_image(
            cluster_id,
            &ImageCreateParams {
                ssh_public_key: ssh_key.map(str::to_string),
                image_type,
            },
        )
        .await?;
        let image = self.download_image(cluster_id).await?;
        if let Some(parent) = image_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(error::WriteSnafu { path: parent })?;
        }
        tokio::fs::write(image_path, &image)
            .await
            .context(error::WriteSnafu { path: image_path })?;
        info!(
            "Downloaded discovery image of cluster {} to '{}'",
            cluster_id,
            image_path.display()
        );
        Ok(())
    }
}

/// An HTTP client for the assisted service.
#[derive(Debug, Clone)]
pub struct InstallerClient {
    http: reqwest::Client,
    base_url: Url,
    offline_token: Option<String>,
}

impl InstallerClient {
    /// Create a client for the service at `service_url`. When `offline_token` is given it is sent
    /// as a bearer token with every request.
    pub fn new(service_url: &str, offline_token: Option<String>) -> Result<Self> {
        let mut normalized = service_url.trim_end_matches('/').to_string();
        normalized.push('/');
        let base_url = Url::parse(&normalized).context(error::UrlSnafu { url: service_url })?;
        let http = reqwest::Client::builder()
            .build()
            .context(error::InitializationSnafu)?;
        Ok(Self {
            http,
            base_url,
            offline_token,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The full url of an API path such as `clusters/{id}/hosts`.
    pub fn url(&self, path: &str) -> Result<Url> {
        let relative = format!("{}/{}", API_PREFIX, path.trim_start_matches('/'));
        Ok(self
            .base_url
            .join(&relative)
            .context(error::UrlSnafu { url: relative })?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match &self.offline_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send the request and turn a non-success status into an error carrying the response body.
    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<Response>
    where
        B: Serialize + Sync,
    {
        let url = self.url(path)?;
        debug!("{} {}", method, url);
        let mut request = self.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.context(error::RequestSnafu {
            method: method.as_str(),
            url: url.as_str(),
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error::StatusSnafu {
                method: method.as_str(),
                url: url.as_str(),
                status,
                body,
            }
            .build()
            .into());
        }
        Ok(response)
    }

    async fn json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        self.send(method, path, body)
            .await?
            .json()
            .await
            .context(error::DecodeSnafu { what: path })
            .map_err(Into::into)
    }

    async fn bytes(&self, path: &str) -> Result<Bytes> {
        self.send(Method::GET, path, NO_BODY)
            .await?
            .bytes()
            .await
            .context(error::DecodeSnafu { what: path })
            .map_err(Into::into)
    }
}

const NO_BODY: Option<&()> = None;

#[async_trait::async_trait]
impl InstallerApi for InstallerClient {
    async fn create_cluster(&self, params: &ClusterCreateParams) -> Result<Cluster> {
        let cluster: Cluster = self.json(Method::POST, "clusters", Some(params)).await?;
        info!("Created cluster '{}' with id {}", cluster.name, cluster.id);
        Ok(cluster)
    }

    async fn clusters_list(&self) -> Result<Vec<Cluster>> {
        self.json(Method::GET, "clusters", NO_BODY).await
    }

    async fn cluster_get(&self, cluster_id: &str) -> Result<Cluster> {
        self.json(Method::GET, &format!("clusters/{}", cluster_id), NO_BODY)
            .await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<()> {
        self.send(Method::DELETE, &format!("clusters/{}", cluster_id), NO_BODY)
            .await?;
        info!("Deleted cluster {}", cluster_id);
        Ok(())
    }

    async fn update_cluster(
        &self,
        cluster_id: &str,
        params: &ClusterUpdateParams,
    ) -> Result<Cluster> {
        debug!("Updating cluster {}: {:?}", cluster_id, params);
        self.json(
            Method::PATCH,
            &format!("clusters/{}", cluster_id),
            Some(params),
        )
        .await
    }

    async fn install_cluster(&self, cluster_id: &str) -> Result<Cluster> {
        info!("Starting installation of cluster {}", cluster_id);
        self.json(
            Method::POST,
            &format!("clusters/{}/actions/install", cluster_id),
            NO_BODY,
        )
        .await
    }

    async fn cancel_cluster_install(&self, cluster_id: &str) -> Result<Cluster> {
        info!("Cancelling installation of cluster {}", cluster_id);
        self.json(
            Method::POST,
            &format!("clusters/{}/actions/cancel", cluster_id),
            NO_BODY,
        )
        .await
    }

    async fn reset_cluster_install(&self, cluster_id: &str) -> Result<Cluster> {
        info!("Resetting installation of cluster {}", cluster_id);
        self.json(
            Method::POST,
            &format!("clusters/{}/actions/reset", cluster_id),
            NO_BODY,
        )
        .await
    }

    async fn get_cluster_hosts(&self, cluster_id: &str) -> Result<Vec<Host>> {
        self.json(
            Method::GET,
            &format!("clusters/{}/hosts", cluster_id),
            NO_BODY,
        )
        .await
    }

    async fn generate_image(&self, cluster_id: &str, params: &ImageCreateParams) -> Result<()> {
        info!(
            "Generating {} discovery image for cluster {}",
            params.image_type, cluster_id
        );
        self.send(
            Method::POST,
            &format!("clusters/{}/downloads/image", cluster_id),
            Some(params),
        )
        .await?;
        Ok(())
    }

    async fn download_image(&self, cluster_id: &str) -> Result<Bytes> {
        self.bytes(&format!("clusters/{}/downloads/image", cluster_id))
            .await
    }

    async fn download_cluster_logs(&self, cluster_id: &str) -> Result<Bytes> {
        self.bytes(&format!("clusters/{}/logs?logs_type=all", cluster_id))
            .await
    }

    async fn get_events(&self, cluster_id: &str) -> Result<Vec<Event>> {
        self.json(
            Method::GET,
            &format!("clusters/{}/events", cluster_id),
            NO_BODY,
        )
        .await
    }

    async fn download_kubeconfig(&self, cluster_id: &str, no_ingress: bool) -> Result<Bytes> {
        let file_name = if no_ingress {
            "kubeconfig-noingress"
        } else {
            "kubeconfig"
        };
        self.bytes(&format!(
            "clusters/{}/downloads/files?file_name={}",
            cluster_id, file_name
        ))
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_urls() {
        let client = InstallerClient::new("http://assisted.example.com:8090", None).unwrap();
        assert_eq!(
            client.url("clusters/abc/hosts").unwrap().as_str(),
            "http://assisted.example.com:8090/api/assisted-install/v1/clusters/abc/hosts"
        );
        assert_eq!(
            client
                .url("/clusters/abc/logs?logs_type=all")
                .unwrap()
                .as_str(),
            "http://assisted.example.com:8090/api/assisted-install/v1/clusters/abc/logs?logs_type=all"
        );
    }

    #[test]
    fn service_url_with_path_prefix() {
        let client = InstallerClient::new("https://api.example.com/proxy/", None).unwrap();
        assert_eq!(
            client.url("clusters").unwrap().as_str(),
            "https://api.example.com/proxy/api/assisted-install/v1/clusters"
        );
    }

    #[test]
    fn invalid_service_url() {
        assert!(InstallerClient::new("not a url", None).is_err());
    }
}
