//! CLI commands

pub mod apply;
pub mod destroy;
pub mod import;
pub mod plan;
pub mod show;

use clusterform_provider::{ClusterClient, HttpClusterApi, ProviderConfig};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::state::StateStore;

/// Everything a remote command needs: the lifecycle client and the state store
pub struct Session {
    pub client: ClusterClient<HttpClusterApi>,
    pub store: StateStore,
}

impl Session {
    /// Load provider settings and connect; `cancel` is fired on Ctrl-C
    pub fn open(store: StateStore, cancel: CancellationToken) -> Result<Self> {
        let config = ProviderConfig::load()?;
        tracing::debug!(base_url = %config.base_url, "using control plane");
        let api = HttpClusterApi::new(&config)?;
        Ok(Self {
            client: ClusterClient::new(api).with_cancellation(cancel),
            store,
        })
    }
}
