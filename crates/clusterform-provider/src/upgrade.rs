//! Shared-tier upgrades
//!
//! Moving a cluster off the shared tier cannot be done with a regular update
//! patch; it needs a dedicated upgrade request. A change qualifies when both
//! the prior and the next layout are a single spec with a single region, the
//! prior instance size is a shared tier, and the size changes.

use clusterform_core::{
    ClusterDescription, ProviderSettings, ReplicationSpec, UpgradeRequest, is_shared_tier,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::ClusterApi;
use crate::error::Result;
use crate::poller::{WaitProfile, await_state};

/// Decide whether a layout change is a shared-tier upgrade
///
/// Returns the upgrade request (built from the next layout) or `None` when
/// the change should go through a regular update.
pub fn select_upgrade_path(
    previous: &[ReplicationSpec],
    next: &[ReplicationSpec],
) -> Option<UpgradeRequest> {
    let ([prev_spec], [next_spec]) = (previous, next) else {
        return None;
    };
    let ([prev_region], [next_region]) = (
        prev_spec.region_configs.as_slice(),
        next_spec.region_configs.as_slice(),
    ) else {
        return None;
    };

    let prev_size = prev_region.electable_instance_size()?;
    let next_size = next_region.electable_instance_size()?;
    if prev_size == next_size || !is_shared_tier(prev_size) {
        return None;
    }

    Some(UpgradeRequest {
        name: String::new(),
        provider_settings: ProviderSettings {
            provider_name: next_region.provider_name.clone(),
            instance_size_name: next_size.to_string(),
            region_name: next_region.region_name.clone(),
        },
    })
}

/// Submit an upgrade and wait for the cluster to settle
pub async fn execute_upgrade<A: ClusterApi + ?Sized>(
    api: &A,
    project_id: &str,
    name: &str,
    request: UpgradeRequest,
    profile: &WaitProfile,
    cancel: &CancellationToken,
) -> Result<ClusterDescription> {
    let request = UpgradeRequest {
        name: name.to_string(),
        ..request
    };
    info!(
        cluster = name,
        provider = %request.provider_settings.provider_name,
        instance_size = %request.provider_settings.instance_size_name,
        "upgrading shared-tier cluster"
    );

    let accepted = api.upgrade_shared(project_id, &request).await?;
    let settled = await_state(name, profile, cancel, || api.get(project_id, name)).await?;
    Ok(settled.unwrap_or(accepted))
}
