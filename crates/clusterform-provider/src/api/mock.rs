//! Mock control plane for testing
//!
//! Clusters are kept in memory. Mutations optionally leave the cluster in a
//! transitional state for a configurable number of polls before it settles,
//! and individual calls can be scripted to fail.

use async_trait::async_trait;
use clusterform_core::{
    ClusterDescription, ClusterRequest, Container, OperationState, ReplicationSpec, UpgradeRequest,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use super::{ClusterApi, DeleteOptions, cluster_not_found};
use crate::error::{ApiError, ApiResult, PAUSED_CONFLICT_CODE};

type Key = (String, String);

/// A call received by the mock, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Get { name: String },
    Create { request: ClusterRequest },
    Update { name: String, patch: ClusterRequest },
    Upgrade { request: UpgradeRequest },
    Delete { name: String, options: DeleteOptions },
    ListContainers { provider_name: String },
}

/// Counts of operations performed for testing assertions
///
/// Pause toggles are counted apart from other updates.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
    pub pauses: usize,
    pub unpauses: usize,
    pub upgrades: usize,
    pub deletes: usize,
    pub container_lists: usize,
}

#[derive(Debug, Clone, Copy)]
enum Settle {
    Idle,
    Gone,
}

#[derive(Debug)]
struct Transition {
    remaining: usize,
    settle: Settle,
}

#[derive(Debug, Default)]
struct Scripts {
    gets: VecDeque<ApiResult<ClusterDescription>>,
    creates: VecDeque<ApiError>,
    updates: VecDeque<ApiError>,
    upgrades: VecDeque<ApiError>,
    deletes: VecDeque<ApiError>,
    container_lists: VecDeque<ApiError>,
}

/// In-memory control plane for testing
#[derive(Clone, Default)]
pub struct MockClusterApi {
    clusters: Arc<RwLock<HashMap<Key, ClusterDescription>>>,
    transitions: Arc<RwLock<HashMap<Key, Transition>>>,
    containers: Arc<RwLock<Vec<Container>>>,
    scripts: Arc<RwLock<Scripts>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    operations: Arc<RwLock<OperationCounts>>,
    settle_polls: Arc<RwLock<usize>>,
    next_id: Arc<RwLock<u64>>,
}

impl MockClusterApi {
    /// Create an empty control plane where every mutation settles at once
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated clusters
    pub fn with_clusters(project_id: &str, clusters: Vec<ClusterDescription>) -> Self {
        let api = Self::new();
        {
            let mut store = api.clusters.write().unwrap();
            for cluster in clusters {
                store.insert((project_id.to_string(), cluster.name.clone()), cluster);
            }
        }
        api
    }

    /// Number of polls a mutated cluster stays transitional before settling
    pub fn settle_after(self, polls: usize) -> Self {
        *self.settle_polls.write().unwrap() = polls;
        self
    }

    /// Network containers returned by `list_containers`
    pub fn with_containers(self, containers: Vec<Container>) -> Self {
        *self.containers.write().unwrap() = containers;
        self
    }

    /// Queue a response for the next `get`, ahead of the stored cluster
    pub fn push_get(&self, result: ApiResult<ClusterDescription>) {
        self.scripts.write().unwrap().gets.push_back(result);
    }

    /// Make the next `create` fail
    pub fn fail_next_create(&self, error: ApiError) {
        self.scripts.write().unwrap().creates.push_back(error);
    }

    /// Make the next `update` fail
    pub fn fail_next_update(&self, error: ApiError) {
        self.scripts.write().unwrap().updates.push_back(error);
    }

    /// Make the next `upgrade_shared` fail
    pub fn fail_next_upgrade(&self, error: ApiError) {
        self.scripts.write().unwrap().upgrades.push_back(error);
    }

    /// Make the next `delete` fail
    pub fn fail_next_delete(&self, error: ApiError) {
        self.scripts.write().unwrap().deletes.push_back(error);
    }

    /// Make the next `list_containers` fail
    pub fn fail_next_container_list(&self, error: ApiError) {
        self.scripts.write().unwrap().container_lists.push_back(error);
    }

    /// Current stored cluster, bypassing transitions and scripts
    pub fn cluster(&self, project_id: &str, name: &str) -> Option<ClusterDescription> {
        self.clusters
            .read()
            .unwrap()
            .get(&key(project_id, name))
            .cloned()
    }

    /// Overwrite the reported state of a stored cluster
    pub fn set_state(&self, project_id: &str, name: &str, state: OperationState) {
        if let Some(cluster) = self.clusters.write().unwrap().get_mut(&key(project_id, name)) {
            cluster.state_name = state.to_string();
        }
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations.read().unwrap().clone()
    }

    /// Reset operation counts and recorded calls
    pub fn reset_counts(&self) {
        *self.operations.write().unwrap() = OperationCounts::default();
        self.calls.write().unwrap().clear();
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.read().unwrap().clone()
    }

    /// Patches received by `update`, in order
    pub fn update_patches(&self) -> Vec<ClusterRequest> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                RecordedCall::Update { patch, .. } => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.write().unwrap().push(call);
    }

    fn count(&self, f: impl FnOnce(&mut OperationCounts)) {
        f(&mut self.operations.write().unwrap());
    }

    fn generate_id(&self) -> String {
        let mut next = self.next_id.write().unwrap();
        *next += 1;
        format!("{:024x}", *next)
    }

    /// Put a mutated cluster into its transitional state, or settle it now
    fn begin_transition(&self, key: Key, transitional: OperationState, settle: Settle) {
        let polls = *self.settle_polls.read().unwrap();
        if polls == 0 {
            self.settle(&key, settle);
            return;
        }
        if let Some(cluster) = self.clusters.write().unwrap().get_mut(&key) {
            cluster.state_name = transitional.to_string();
        }
        self.transitions.write().unwrap().insert(
            key,
            Transition {
                remaining: polls,
                settle,
            },
        );
    }

    fn settle(&self, key: &Key, settle: Settle) {
        let mut clusters = self.clusters.write().unwrap();
        match settle {
            Settle::Idle => {
                if let Some(cluster) = clusters.get_mut(key) {
                    cluster.state_name = OperationState::Idle.to_string();
                }
            }
            Settle::Gone => {
                clusters.remove(key);
            }
        }
    }

    /// Advance a pending transition by one poll
    fn tick(&self, key: &Key) {
        let finished = {
            let mut transitions = self.transitions.write().unwrap();
            let done = match transitions.get_mut(key) {
                Some(t) if t.remaining > 0 => {
                    t.remaining -= 1;
                    false
                }
                Some(_) => true,
                None => false,
            };
            if done {
                transitions.remove(key).map(|t| t.settle)
            } else {
                None
            }
        };
        if let Some(settle) = finished {
            self.settle(key, settle);
        }
    }

    fn assign_spec_ids(&self, specs: &[ReplicationSpec]) -> Vec<ReplicationSpec> {
        specs
            .iter()
            .map(|spec| {
                let mut spec = spec.clone();
                if spec.id.is_empty() {
                    spec.id = self.generate_id();
                }
                spec.container_id.clear();
                spec
            })
            .collect()
    }
}

fn key(project_id: &str, name: &str) -> Key {
    (project_id.to_string(), name.to_string())
}

fn paused_conflict(name: &str) -> ApiError {
    ApiError::remote(
        409,
        Some(PAUSED_CONFLICT_CODE),
        format!("Cannot update cluster {name} while it is paused or being paused."),
    )
}

fn apply_patch(cluster: &mut ClusterDescription, patch: &ClusterRequest) {
    if let Some(cluster_type) = &patch.cluster_type {
        cluster.cluster_type = Some(cluster_type.clone());
    }
    if let Some(paused) = patch.paused {
        cluster.paused = Some(paused);
    }
    if patch.backup_enabled.is_some() {
        cluster.backup_enabled = patch.backup_enabled;
    }
    if patch.pit_enabled.is_some() {
        cluster.pit_enabled = patch.pit_enabled;
    }
    if patch.disk_size_gb.is_some() {
        cluster.disk_size_gb = patch.disk_size_gb;
    }
    if patch.mongo_db_major_version.is_some() {
        cluster.mongo_db_major_version = patch.mongo_db_major_version.clone();
    }
    if patch.encryption_at_rest_provider.is_some() {
        cluster.encryption_at_rest_provider = patch.encryption_at_rest_provider.clone();
    }
    if patch.root_cert_type.is_some() {
        cluster.root_cert_type = patch.root_cert_type.clone();
    }
    if patch.version_release_system.is_some() {
        cluster.version_release_system = patch.version_release_system.clone();
    }
    if patch.termination_protection_enabled.is_some() {
        cluster.termination_protection_enabled = patch.termination_protection_enabled;
    }
    if let Some(labels) = &patch.labels {
        cluster.labels = labels.clone();
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn get(&self, project_id: &str, name: &str) -> ApiResult<ClusterDescription> {
        self.count(|ops| ops.gets += 1);
        self.record(RecordedCall::Get {
            name: name.to_string(),
        });

        if let Some(result) = self.scripts.write().unwrap().gets.pop_front() {
            return result;
        }

        let key = key(project_id, name);
        self.tick(&key);
        let snapshot = self.clusters.read().unwrap().get(&key).cloned();
        snapshot.ok_or_else(|| cluster_not_found(project_id, name))
    }

    async fn create(&self, project_id: &str, request: &ClusterRequest) -> ApiResult<ClusterDescription> {
        self.count(|ops| ops.creates += 1);
        self.record(RecordedCall::Create {
            request: request.clone(),
        });

        if let Some(error) = self.scripts.write().unwrap().creates.pop_front() {
            return Err(error);
        }

        let name = request.name.clone().unwrap_or_default();
        let key = key(project_id, &name);
        if self.clusters.read().unwrap().contains_key(&key) {
            return Err(ApiError::remote(
                400,
                Some("DUPLICATE_CLUSTER_NAME"),
                format!("A cluster named {name} is already present in group {project_id}."),
            ));
        }

        let mut cluster = ClusterDescription {
            id: self.generate_id(),
            group_id: project_id.to_string(),
            name: name.clone(),
            state_name: OperationState::Creating.to_string(),
            paused: Some(false),
            replication_specs: self
                .assign_spec_ids(request.replication_specs.as_deref().unwrap_or_default()),
            ..Default::default()
        };
        apply_patch(&mut cluster, request);

        self.clusters.write().unwrap().insert(key.clone(), cluster.clone());
        self.begin_transition(key, OperationState::Creating, Settle::Idle);
        Ok(cluster)
    }

    async fn update(
        &self,
        project_id: &str,
        name: &str,
        patch: &ClusterRequest,
    ) -> ApiResult<ClusterDescription> {
        self.count(|ops| match patch.paused {
            Some(true) if patch.is_pause_toggle() => ops.pauses += 1,
            Some(false) if patch.is_pause_toggle() => ops.unpauses += 1,
            _ => ops.updates += 1,
        });
        self.record(RecordedCall::Update {
            name: name.to_string(),
            patch: patch.clone(),
        });

        if let Some(error) = self.scripts.write().unwrap().updates.pop_front() {
            return Err(error);
        }

        let key = key(project_id, name);
        let updated = {
            let mut clusters = self.clusters.write().unwrap();
            let cluster = clusters
                .get_mut(&key)
                .ok_or_else(|| cluster_not_found(project_id, name))?;

            if cluster.paused == Some(true) && patch.paused != Some(false) {
                return Err(paused_conflict(name));
            }

            apply_patch(cluster, patch);
            if let Some(specs) = &patch.replication_specs {
                cluster.replication_specs = self.assign_spec_ids(specs);
            }
            cluster.state_name = OperationState::Updating.to_string();
            cluster.clone()
        };

        self.begin_transition(key, OperationState::Updating, Settle::Idle);
        Ok(updated)
    }

    async fn upgrade_shared(
        &self,
        project_id: &str,
        request: &UpgradeRequest,
    ) -> ApiResult<ClusterDescription> {
        self.count(|ops| ops.upgrades += 1);
        self.record(RecordedCall::Upgrade {
            request: request.clone(),
        });

        if let Some(error) = self.scripts.write().unwrap().upgrades.pop_front() {
            return Err(error);
        }

        let key = key(project_id, &request.name);
        let upgraded = {
            let mut clusters = self.clusters.write().unwrap();
            let cluster = clusters
                .get_mut(&key)
                .ok_or_else(|| cluster_not_found(project_id, &request.name))?;

            let settings = &request.provider_settings;
            if let Some(region) = cluster
                .replication_specs
                .first_mut()
                .and_then(|spec| spec.region_configs.first_mut())
            {
                region.provider_name = settings.provider_name.clone();
                region.backing_provider_name = None;
                region.region_name = settings.region_name.clone();
                let electable = region.electable_specs.get_or_insert_with(Default::default);
                electable.instance_size = settings.instance_size_name.clone();
            }
            cluster.state_name = OperationState::Updating.to_string();
            cluster.clone()
        };

        self.begin_transition(key, OperationState::Updating, Settle::Idle);
        Ok(upgraded)
    }

    async fn delete(&self, project_id: &str, name: &str, options: DeleteOptions) -> ApiResult<()> {
        self.count(|ops| ops.deletes += 1);
        self.record(RecordedCall::Delete {
            name: name.to_string(),
            options,
        });

        if let Some(error) = self.scripts.write().unwrap().deletes.pop_front() {
            return Err(error);
        }

        let key = key(project_id, name);
        if !self.clusters.read().unwrap().contains_key(&key) {
            return Err(cluster_not_found(project_id, name));
        }

        self.begin_transition(key, OperationState::Deleting, Settle::Gone);
        Ok(())
    }

    async fn list_containers(&self, _project_id: &str, provider_name: &str) -> ApiResult<Vec<Container>> {
        self.count(|ops| ops.container_lists += 1);
        self.record(RecordedCall::ListContainers {
            provider_name: provider_name.to_string(),
        });

        if let Some(error) = self.scripts.write().unwrap().container_lists.pop_front() {
            return Err(error);
        }

        Ok(self
            .containers
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.provider_name == provider_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = "5f1b2c3d4e5f6a7b8c9d0e1f";

    fn request(name: &str) -> ClusterRequest {
        ClusterRequest {
            name: Some(name.to_string()),
            replication_specs: Some(vec![ReplicationSpec {
                zone_name: "Zone 1".to_string(),
                num_shards: 1,
                ..Default::default()
            }]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_settles() {
        let api = MockClusterApi::new();
        let created = api.create(PROJECT, &request("orders")).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(created.replication_specs[0].has_id());

        let current = api.get(PROJECT, "orders").await.unwrap();
        assert_eq!(current.state_name, "IDLE");
        assert_eq!(api.operation_counts().creates, 1);
    }

    #[tokio::test]
    async fn test_transition_lasts_configured_polls() {
        let api = MockClusterApi::new().settle_after(2);
        api.create(PROJECT, &request("orders")).await.unwrap();

        assert_eq!(api.get(PROJECT, "orders").await.unwrap().state_name, "CREATING");
        assert_eq!(api.get(PROJECT, "orders").await.unwrap().state_name, "CREATING");
        assert_eq!(api.get(PROJECT, "orders").await.unwrap().state_name, "IDLE");
    }

    #[tokio::test]
    async fn test_delete_then_not_found() {
        let api = MockClusterApi::new();
        api.create(PROJECT, &request("orders")).await.unwrap();
        api.delete(PROJECT, "orders", DeleteOptions::default())
            .await
            .unwrap();

        let err = api.get(PROJECT, "orders").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(api.find(PROJECT, "orders").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_paused_cluster_rejects_updates() {
        let api = MockClusterApi::new();
        api.create(PROJECT, &request("orders")).await.unwrap();
        api.update(PROJECT, "orders", &ClusterRequest::paused(true))
            .await
            .unwrap();

        let patch = ClusterRequest {
            disk_size_gb: Some(20.0),
            ..Default::default()
        };
        let err = api.update(PROJECT, "orders", &patch).await.unwrap_err();
        assert!(err.is_paused_conflict());

        api.update(PROJECT, "orders", &ClusterRequest::paused(false))
            .await
            .unwrap();
        api.update(PROJECT, "orders", &patch).await.unwrap();

        let counts = api.operation_counts();
        assert_eq!(counts.pauses, 1);
        assert_eq!(counts.unpauses, 1);
        assert_eq!(counts.updates, 2);
        assert_eq!(api.cluster(PROJECT, "orders").unwrap().disk_size_gb, Some(20.0));
    }

    #[tokio::test]
    async fn test_scripted_get_takes_precedence() {
        let api = MockClusterApi::new();
        api.push_get(Err(ApiError::remote(503, None, "maintenance")));
        let err = api.get(PROJECT, "orders").await.unwrap_err();
        assert!(err.is_service_unavailable());
        assert!(api.get(PROJECT, "orders").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_containers_filters_provider() {
        let api = MockClusterApi::new().with_containers(vec![
            Container {
                id: "c1".to_string(),
                provider_name: "AWS".to_string(),
                ..Default::default()
            },
            Container {
                id: "c2".to_string(),
                provider_name: "GCP".to_string(),
                ..Default::default()
            },
        ]);
        let aws = api.list_containers(PROJECT, "AWS").await.unwrap();
        assert_eq!(aws.len(), 1);
        assert_eq!(aws[0].id, "c1");
    }
}
