//! High-level cluster lifecycle client
//!
//! Combines the remote API, the spec matcher, the convergence poller, the
//! conflict-aware updater and the upgrade selector into create, read,
//! update, delete and import.

use clusterform_core::{
    ClusterConfig, ClusterDescription, ClusterRequest, OperationState, ReplicationSpec,
    UpgradeRequest, parse_import_id, validate_config,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{ClusterApi, DeleteOptions};
use crate::error::{ProviderError, Result};
use crate::matcher::{ContainerIndex, assign_known_ids, reconcile_replication_specs};
use crate::poller::{WaitProfile, await_state};
use crate::updater::Updater;
use crate::upgrade::{execute_upgrade, select_upgrade_path};

/// What an update will do
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    /// Nothing differs
    NoChange,
    /// Move off the shared tier through the upgrade endpoint
    Upgrade(UpgradeRequest),
    /// Sparse patch, optionally followed by pausing
    Update {
        patch: ClusterRequest,
        pause_after: bool,
    },
}

impl Plan {
    /// Work out how to move a cluster from `prior` to `next`
    ///
    /// Replication spec ids known from `prior` are carried onto `next` first,
    /// so unchanged zones are modified in place.
    pub fn compute(prior: &ClusterConfig, next: &ClusterConfig) -> Self {
        let mut next = next.clone();
        assign_known_ids(&mut next.replication_specs, &prior.replication_specs);

        if let Some(request) =
            select_upgrade_path(&prior.replication_specs, &next.replication_specs)
        {
            return Plan::Upgrade(request);
        }

        let patch = ClusterRequest::diff(prior, &next);
        if patch.is_empty() && prior.paused == next.paused {
            return Plan::NoChange;
        }
        Plan::Update {
            patch,
            pause_after: next.paused,
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Plan::NoChange)
    }
}

/// A cluster as last read, with replication specs shaped after the desired ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterState {
    pub project_id: String,
    pub cluster: ClusterDescription,
}

impl ClusterState {
    /// Reported state, if it is a known one
    pub fn state(&self) -> Option<OperationState> {
        self.cluster.state().ok()
    }

    /// The desired document with remote-assigned ids and read-only fields filled in
    pub fn applied_config(&self, desired: &ClusterConfig) -> ClusterConfig {
        ClusterConfig {
            replication_specs: self.cluster.replication_specs.clone(),
            paused: self.cluster.paused.unwrap_or(desired.paused),
            ..desired.clone()
        }
    }
}

/// High-level lifecycle client
pub struct ClusterClient<A: ClusterApi> {
    api: A,
    cancel: CancellationToken,
    poll_intervals: Option<(Duration, Duration)>,
}

impl<A: ClusterApi> ClusterClient<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            cancel: CancellationToken::new(),
            poll_intervals: None,
        }
    }

    /// Abort waits and retries when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Override the poll timing of every wait (minimum interval, initial delay)
    pub fn with_poll_intervals(mut self, min_interval: Duration, initial_delay: Duration) -> Self {
        self.poll_intervals = Some((min_interval, initial_delay));
        self
    }

    fn profile(&self, profile: WaitProfile) -> WaitProfile {
        match self.poll_intervals {
            Some((min_interval, initial_delay)) => {
                profile.with_intervals(min_interval, initial_delay)
            }
            None => profile,
        }
    }

    fn updater<'a>(&'a self, project_id: &'a str, name: &'a str) -> Updater<'a, A> {
        Updater::new(&self.api, project_id, name, &self.cancel)
            .with_profile(self.profile(WaitProfile::update(Duration::ZERO)))
    }

    async fn wait(&self, config: &ClusterConfig, profile: WaitProfile) -> Result<Option<ClusterDescription>> {
        let profile = self.profile(profile);
        await_state(&config.name, &profile, &self.cancel, || {
            self.api.get(&config.project_id, &config.name)
        })
        .await
    }

    // ========== Create ==========

    /// Create a cluster and wait until it is ready
    ///
    /// A cluster declared as paused is created running and paused afterwards.
    pub async fn create(&self, config: &ClusterConfig) -> Result<ClusterState> {
        validate_config(config)?;

        info!(cluster = %config.name, project = %config.project_id, "creating cluster");
        let request = ClusterRequest::for_create(config);
        self.api.create(&config.project_id, &request).await?;

        self.wait(config, WaitProfile::create(config.timeouts.create))
            .await?;

        if config.paused {
            info!(cluster = %config.name, "pausing newly created cluster");
            self.updater(&config.project_id, &config.name)
                .set_paused(true, config.timeouts.update)
                .await?;
        }

        self.read_required(config).await
    }

    // ========== Read ==========

    /// Read a cluster, shaping its replication specs after `desired`
    ///
    /// Returns `None` when the cluster no longer exists.
    pub async fn read(
        &self,
        project_id: &str,
        name: &str,
        desired: Option<&[ReplicationSpec]>,
    ) -> Result<Option<ClusterState>> {
        let Some(mut cluster) = self.api.find(project_id, name).await? else {
            return Ok(None);
        };

        let containers = self
            .container_index(project_id, &cluster.replication_specs)
            .await?;
        cluster.replication_specs = reconcile_replication_specs(
            desired.unwrap_or_default(),
            &cluster.replication_specs,
            &containers,
        );

        Ok(Some(ClusterState {
            project_id: project_id.to_string(),
            cluster,
        }))
    }

    async fn read_required(&self, config: &ClusterConfig) -> Result<ClusterState> {
        self.read(
            &config.project_id,
            &config.name,
            Some(config.replication_specs.as_slice()),
        )
        .await?
        .ok_or_else(|| ProviderError::ClusterNotFound {
            project_id: config.project_id.clone(),
            name: config.name.clone(),
        })
    }

    /// Fetch the containers of every non-tenant provider in use, once per provider
    async fn container_index(
        &self,
        project_id: &str,
        specs: &[ReplicationSpec],
    ) -> Result<ContainerIndex> {
        let providers: BTreeSet<&str> = specs
            .iter()
            .flat_map(|spec| &spec.region_configs)
            .filter(|region| !region.is_tenant())
            .map(|region| region.provider_name.as_str())
            .collect();

        let mut index = ContainerIndex::new();
        for provider in providers {
            let containers = self.api.list_containers(project_id, provider).await?;
            index.insert(provider.to_string(), containers);
        }
        Ok(index)
    }

    // ========== Update ==========

    /// Move a cluster from `prior` (last applied) to `next`
    pub async fn update(&self, prior: &ClusterConfig, next: &ClusterConfig) -> Result<ClusterState> {
        validate_config(next)?;
        if prior.project_id != next.project_id || prior.name != next.name {
            return Err(ProviderError::InvalidConfig(format!(
                "cannot rename cluster '{}' in project '{}'; destroy and recreate it instead",
                prior.name, prior.project_id
            )));
        }

        match Plan::compute(prior, next) {
            Plan::NoChange => {
                info!(cluster = %next.name, "no changes");
            }
            Plan::Upgrade(request) => {
                let profile = self.profile(WaitProfile::upgrade(next.timeouts.update));
                execute_upgrade(
                    &self.api,
                    &next.project_id,
                    &next.name,
                    request,
                    &profile,
                    &self.cancel,
                )
                .await?;
            }
            Plan::Update { patch, pause_after } => {
                info!(
                    cluster = %next.name,
                    fields = ?patch.changed_fields(),
                    pause_after,
                    "updating cluster"
                );
                self.updater(&next.project_id, &next.name)
                    .apply(&patch, pause_after, next.timeouts.update)
                    .await?;
            }
        }

        self.read_required(next).await
    }

    // ========== Delete ==========

    /// Delete a cluster and wait until it is gone
    pub async fn delete(&self, config: &ClusterConfig) -> Result<()> {
        let options = DeleteOptions {
            retain_backups: config.retain_backups_enabled.unwrap_or(false),
        };
        info!(
            cluster = %config.name,
            retain_backups = options.retain_backups,
            "deleting cluster"
        );
        self.api
            .delete(&config.project_id, &config.name, options)
            .await?;

        self.wait(config, WaitProfile::delete(config.timeouts.delete))
            .await?;
        Ok(())
    }

    // ========== Import ==========

    /// Adopt an existing cluster from a `<project_id>-<name>` identifier
    pub async fn import(&self, id: &str) -> Result<(ClusterConfig, ClusterState)> {
        let (project_id, name) = parse_import_id(id)?;
        let state = self
            .read(&project_id, &name, None)
            .await?
            .ok_or_else(|| ProviderError::ClusterNotFound {
                project_id: project_id.clone(),
                name: name.clone(),
            })?;

        let config = ClusterConfig::from_description(&project_id, &state.cluster);
        Ok((config, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterform_core::{AutoScaling, NodeSpec, RegionConfig};

    fn config(yaml: &str) -> ClusterConfig {
        ClusterConfig::from_yaml(yaml).unwrap()
    }

    fn base() -> ClusterConfig {
        config(
            r#"
projectId: 5f1b2c3d4e5f6a7b8c9d0e1f
name: orders
replicationSpecs:
  - id: spec-1
    zoneName: Zone 1
    regionConfigs:
      - providerName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: M10
          nodeCount: 3
"#,
        )
    }

    #[test]
    fn test_plan_no_change() {
        assert!(Plan::compute(&base(), &base()).is_no_change());
    }

    #[test]
    fn test_plan_no_change_without_ids() {
        let mut next = base();
        next.replication_specs[0].id.clear();
        assert!(Plan::compute(&base(), &next).is_no_change());
    }

    #[test]
    fn test_plan_update_carries_ids() {
        let mut next = base();
        next.replication_specs[0].id.clear();
        next.replication_specs[0].num_shards = 2;

        let Plan::Update { patch, pause_after } = Plan::compute(&base(), &next) else {
            panic!("expected update");
        };
        assert!(!pause_after);
        assert_eq!(patch.replication_specs.unwrap()[0].id, "spec-1");
    }

    #[test]
    fn test_plan_pause_only() {
        let mut next = base();
        next.paused = true;

        let plan = Plan::compute(&base(), &next);
        assert_eq!(
            plan,
            Plan::Update {
                patch: ClusterRequest::default(),
                pause_after: true,
            }
        );
    }

    #[test]
    fn test_plan_unpause_folded_into_patch() {
        let mut prior = base();
        prior.paused = true;
        let mut next = base();
        next.disk_size_gb = Some(20.0);

        let Plan::Update { patch, pause_after } = Plan::compute(&prior, &next) else {
            panic!("expected update");
        };
        assert!(!pause_after);
        assert_eq!(patch.paused, Some(false));
        assert_eq!(patch.disk_size_gb, Some(20.0));
    }

    #[test]
    fn test_plan_upgrade() {
        let mut prior = base();
        prior.replication_specs[0].region_configs[0] = RegionConfig {
            provider_name: "TENANT".to_string(),
            backing_provider_name: Some("AWS".to_string()),
            region_name: "US_EAST_1".to_string(),
            priority: 7,
            electable_specs: Some(NodeSpec {
                instance_size: "M2".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(matches!(Plan::compute(&prior, &base()), Plan::Upgrade(_)));
    }

    #[test]
    fn test_applied_config_takes_remote_specs() {
        let desired = base();
        let mut cluster = ClusterDescription {
            name: "orders".to_string(),
            state_name: "IDLE".to_string(),
            paused: Some(false),
            replication_specs: desired.replication_specs.clone(),
            ..Default::default()
        };
        cluster.replication_specs[0]
            .container_id
            .insert("AWS:US_EAST_1".to_string(), "vpc-1".to_string());

        let state = ClusterState {
            project_id: desired.project_id.clone(),
            cluster,
        };
        let applied = state.applied_config(&desired);
        assert_eq!(applied.replication_specs[0].container_id.len(), 1);
        assert_eq!(applied.name, "orders");
        assert_eq!(state.state(), Some(OperationState::Idle));
    }

    #[test]
    fn test_read_back_with_remote_filled_fields_plans_no_change() {
        let mut desired = base();
        desired.replication_specs[0].id.clear();
        desired.replication_specs[0].region_configs[0].auto_scaling = Some(AutoScaling {
            disk_gb_enabled: Some(true),
            ..Default::default()
        });

        let mut remote = base().replication_specs;
        {
            let region = &mut remote[0].region_configs[0];
            region.auto_scaling = Some(AutoScaling {
                disk_gb_enabled: Some(true),
                compute_enabled: Some(false),
                compute_scale_down_enabled: Some(false),
                ..Default::default()
            });
            region.read_only_specs = Some(NodeSpec {
                instance_size: "M10".to_string(),
                node_count: Some(0),
                ..Default::default()
            });
            region.electable_specs.as_mut().unwrap().disk_iops = Some(3000);
        }

        let state = ClusterState {
            project_id: desired.project_id.clone(),
            cluster: ClusterDescription {
                name: "orders".to_string(),
                state_name: "IDLE".to_string(),
                paused: Some(false),
                replication_specs: reconcile_replication_specs(
                    &desired.replication_specs,
                    &remote,
                    &ContainerIndex::new(),
                ),
                ..Default::default()
            },
        };
        let applied = state.applied_config(&desired);

        assert_eq!(Plan::compute(&applied, &desired), Plan::NoChange);
    }
}
