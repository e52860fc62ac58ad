//! Remote control plane clients
//!
//! Every lifecycle operation talks to the control plane through the
//! [`ClusterApi`] trait:
//! - **Http**: the real REST client (`HttpClusterApi`)
//! - **Mock**: an in-memory control plane with scripted responses, for tests

mod http;
mod mock;

pub use http::HttpClusterApi;
pub use mock::{MockClusterApi, OperationCounts, RecordedCall};

use async_trait::async_trait;
use clusterform_core::{ClusterDescription, ClusterRequest, Container, UpgradeRequest};

use crate::error::{ApiError, ApiResult};

/// Options for cluster deletion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    /// Keep the cluster's backup snapshots after deletion
    pub retain_backups: bool,
}

/// Client for the cluster endpoints of the control plane
///
/// Implementations must be Send + Sync for use across async tasks.
/// Errors keep the remote status and error code so callers can classify them.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetch the current snapshot of a cluster
    async fn get(&self, project_id: &str, name: &str) -> ApiResult<ClusterDescription>;

    /// Submit a cluster creation
    async fn create(&self, project_id: &str, request: &ClusterRequest) -> ApiResult<ClusterDescription>;

    /// Submit a sparse update patch
    async fn update(
        &self,
        project_id: &str,
        name: &str,
        patch: &ClusterRequest,
    ) -> ApiResult<ClusterDescription>;

    /// Submit a shared-tier upgrade
    async fn upgrade_shared(
        &self,
        project_id: &str,
        request: &UpgradeRequest,
    ) -> ApiResult<ClusterDescription>;

    /// Submit a cluster deletion
    async fn delete(&self, project_id: &str, name: &str, options: DeleteOptions) -> ApiResult<()>;

    /// List the network containers of one provider in a project
    async fn list_containers(&self, project_id: &str, provider_name: &str) -> ApiResult<Vec<Container>>;

    /// Fetch a cluster, mapping 404 to `None`
    async fn find(&self, project_id: &str, name: &str) -> ApiResult<Option<ClusterDescription>> {
        match self.get(project_id, name).await {
            Ok(cluster) => Ok(Some(cluster)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Shorthand for a 404 with the control plane's error code
pub(crate) fn cluster_not_found(project_id: &str, name: &str) -> ApiError {
    ApiError::remote(
        404,
        Some("CLUSTER_NOT_FOUND"),
        format!("No cluster named {name} exists in group {project_id}."),
    )
}
