//! REST client for the control plane cluster endpoints

use async_trait::async_trait;
use clusterform_core::{ClusterDescription, ClusterRequest, Container, UpgradeRequest};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{ClusterApi, DeleteOptions};
use crate::config::{ProviderConfig, ResolvedCredentials};
use crate::error::{ApiError, ApiResult, ProviderError, Result};

const CLUSTERS_API: &str = "v1.5";
const NETWORK_API: &str = "v1.0";

/// Error document returned with non-2xx responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

/// Paginated list envelope
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

/// HTTP implementation of [`ClusterApi`]
pub struct HttpClusterApi {
    client: reqwest::Client,
    base_url: Url,
    credentials: Option<ResolvedCredentials>,
}

impl HttpClusterApi {
    /// Build a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ProviderError::InvalidConfig(format!("invalid base URL '{}': {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::InvalidConfig(format!(
                "base URL '{}' cannot carry a path",
                config.base_url
            )));
        }

        let credentials = config
            .credentials
            .as_ref()
            .map(|c| c.resolve())
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("clusterform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    fn endpoint(&self, version: &str, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "atlas", version, "groups"])
                .extend(segments);
        }
        url
    }

    fn cluster_url(&self, project_id: &str, name: &str) -> Url {
        self.endpoint(CLUSTERS_API, &[project_id, "clusters", name])
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        tracing::debug!(%method, %url, "control plane request");
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json");
        if let Some(credentials) = &self.credentials {
            request = request.header(AUTHORIZATION, credentials.auth_header());
        }
        request
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> ApiResult<T> {
        let response = request.send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(transport_error)
    }
}

/// Convert a non-2xx response into a remote error, keeping its code
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let detail = body
        .detail
        .or(body.reason)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    Err(ApiError::Remote {
        status: status.as_u16(),
        error_code: body.error_code,
        detail,
    })
}

/// Flatten a reqwest error and its sources into one message
fn transport_error(e: reqwest::Error) -> ApiError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ApiError::Transport { message }
}

#[async_trait]
impl ClusterApi for HttpClusterApi {
    async fn get(&self, project_id: &str, name: &str) -> ApiResult<ClusterDescription> {
        let url = self.cluster_url(project_id, name);
        Self::send(self.request(reqwest::Method::GET, url)).await
    }

    async fn create(&self, project_id: &str, request: &ClusterRequest) -> ApiResult<ClusterDescription> {
        let url = self.endpoint(CLUSTERS_API, &[project_id, "clusters"]);
        Self::send(
            self.request(reqwest::Method::POST, url)
                .header(CONTENT_TYPE, "application/json")
                .json(request),
        )
        .await
    }

    async fn update(
        &self,
        project_id: &str,
        name: &str,
        patch: &ClusterRequest,
    ) -> ApiResult<ClusterDescription> {
        let url = self.cluster_url(project_id, name);
        Self::send(
            self.request(reqwest::Method::PATCH, url)
                .header(CONTENT_TYPE, "application/json")
                .json(patch),
        )
        .await
    }

    async fn upgrade_shared(
        &self,
        project_id: &str,
        request: &UpgradeRequest,
    ) -> ApiResult<ClusterDescription> {
        let url = self.endpoint(NETWORK_API, &[project_id, "clusters", "tenantUpgrade"]);
        Self::send(
            self.request(reqwest::Method::POST, url)
                .header(CONTENT_TYPE, "application/json")
                .json(request),
        )
        .await
    }

    async fn delete(&self, project_id: &str, name: &str, options: DeleteOptions) -> ApiResult<()> {
        let mut url = self.cluster_url(project_id, name);
        if options.retain_backups {
            url.query_pairs_mut().append_pair("retainBackups", "true");
        }
        let response = self
            .request(reqwest::Method::DELETE, url)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn list_containers(&self, project_id: &str, provider_name: &str) -> ApiResult<Vec<Container>> {
        let mut url = self.endpoint(NETWORK_API, &[project_id, "containers"]);
        url.query_pairs_mut().append_pair("providerName", provider_name);
        let page: Page<Container> = Self::send(self.request(reqwest::Method::GET, url)).await?;
        Ok(page.results)
    }
}
