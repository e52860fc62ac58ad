//! Cluster documents: desired configuration, remote snapshot, and requests

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::error::Result;
use crate::spec::ReplicationSpec;
use crate::state::OperationState;
use crate::timeouts::Timeouts;

fn default_cluster_type() -> String {
    "REPLICASET".to_string()
}

/// The desired cluster, as authored by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Project (group) the cluster belongs to
    pub project_id: String,

    /// Cluster name, unique within the project
    pub name: String,

    /// REPLICASET, SHARDED, or GEOSHARDED
    #[serde(default = "default_cluster_type")]
    pub cluster_type: String,

    /// Replication specs, in the order the user declared them
    #[serde(default)]
    pub replication_specs: Vec<ReplicationSpec>,

    /// Desired pause state
    #[serde(default)]
    pub paused: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cert_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_release_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_protection_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Keep snapshots when the cluster is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_backups_enabled: Option<bool>,

    /// Time budgets for create/update/delete
    #[serde(default)]
    pub timeouts: Timeouts,
}

impl ClusterConfig {
    /// Load a cluster document from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse a cluster document from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build a fully remote-derived configuration (used on import)
    pub fn from_description(project_id: &str, cluster: &ClusterDescription) -> Self {
        Self {
            project_id: project_id.to_string(),
            name: cluster.name.clone(),
            cluster_type: cluster
                .cluster_type
                .clone()
                .unwrap_or_else(default_cluster_type),
            replication_specs: cluster.replication_specs.clone(),
            paused: cluster.paused.unwrap_or(false),
            backup_enabled: cluster.backup_enabled,
            pit_enabled: cluster.pit_enabled,
            disk_size_gb: cluster.disk_size_gb,
            mongo_db_major_version: cluster.mongo_db_major_version.clone(),
            encryption_at_rest_provider: cluster.encryption_at_rest_provider.clone(),
            root_cert_type: cluster.root_cert_type.clone(),
            version_release_system: cluster.version_release_system.clone(),
            termination_protection_enabled: cluster.termination_protection_enabled,
            labels: cluster.labels.clone(),
            retain_backups_enabled: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// Connection endpoints reported by the control plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStrings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_srv: Option<String>,
}

/// A snapshot of a cluster as returned by the control plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDescription {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub group_id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,

    /// Raw provisioning state (see `OperationState`)
    #[serde(default)]
    pub state_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    #[serde(default)]
    pub replication_specs: Vec<ReplicationSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "mongoDBVersion")]
    pub mongo_db_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cert_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_release_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_protection_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_strings: Option<ConnectionStrings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<DateTime<Utc>>,
}

impl ClusterDescription {
    /// Parse the reported state into the closed state set
    pub fn state(&self) -> Result<OperationState> {
        OperationState::from_str(&self.state_name)
    }
}

/// Request body for cluster creation and sparse update patches
///
/// Every field is optional; only the fields that are set are sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_specs: Option<Vec<ReplicationSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pit_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "mongoDBMajorVersion")]
    pub mongo_db_major_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cert_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_release_system: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_protection_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}

impl ClusterRequest {
    /// Build a creation request from the desired configuration
    ///
    /// `paused` is never part of a create; pausing is a follow-up patch.
    pub fn for_create(config: &ClusterConfig) -> Self {
        Self {
            name: Some(config.name.clone()),
            cluster_type: Some(config.cluster_type.clone()),
            replication_specs: Some(
                config
                    .replication_specs
                    .iter()
                    .map(ReplicationSpec::to_request)
                    .collect(),
            ),
            paused: None,
            backup_enabled: config.backup_enabled,
            pit_enabled: config.pit_enabled,
            disk_size_gb: config.disk_size_gb,
            mongo_db_major_version: config.mongo_db_major_version.clone(),
            encryption_at_rest_provider: config.encryption_at_rest_provider.clone(),
            root_cert_type: config.root_cert_type.clone(),
            version_release_system: config.version_release_system.clone(),
            termination_protection_enabled: config.termination_protection_enabled,
            labels: (!config.labels.is_empty()).then(|| config.labels.clone()),
        }
    }

    /// Build a sparse patch holding only the attributes that changed
    ///
    /// A paused -> running transition is folded into the patch. The reverse
    /// is left out: pausing happens after every other change has settled.
    pub fn diff(prior: &ClusterConfig, next: &ClusterConfig) -> Self {
        let mut patch = Self::default();

        if prior.cluster_type != next.cluster_type {
            patch.cluster_type = Some(next.cluster_type.clone());
        }
        if !same_layout(&prior.replication_specs, &next.replication_specs) {
            patch.replication_specs = Some(
                next.replication_specs
                    .iter()
                    .map(ReplicationSpec::to_request)
                    .collect(),
            );
        }
        if prior.paused && !next.paused {
            patch.paused = Some(false);
        }

        patch.backup_enabled = changed(&prior.backup_enabled, &next.backup_enabled);
        patch.pit_enabled = changed(&prior.pit_enabled, &next.pit_enabled);
        patch.disk_size_gb = changed(&prior.disk_size_gb, &next.disk_size_gb);
        patch.mongo_db_major_version =
            changed(&prior.mongo_db_major_version, &next.mongo_db_major_version);
        patch.encryption_at_rest_provider = changed(
            &prior.encryption_at_rest_provider,
            &next.encryption_at_rest_provider,
        );
        patch.root_cert_type = changed(&prior.root_cert_type, &next.root_cert_type);
        patch.version_release_system =
            changed(&prior.version_release_system, &next.version_release_system);
        patch.termination_protection_enabled = changed(
            &prior.termination_protection_enabled,
            &next.termination_protection_enabled,
        );

        if prior.labels != next.labels {
            patch.labels = Some(next.labels.clone());
        }

        patch
    }

    /// Patch that only toggles the pause state
    pub fn paused(paused: bool) -> Self {
        Self {
            paused: Some(paused),
            ..Default::default()
        }
    }

    /// Whether this patch carries no change at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether this patch only toggles the pause state
    pub fn is_pause_toggle(&self) -> bool {
        self.paused.is_some()
            && Self {
                paused: None,
                ..self.clone()
            }
            .is_empty()
    }

    /// Names of the attributes this patch sets (for plan output)
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut push = |set: bool, name: &'static str| {
            if set {
                fields.push(name);
            }
        };
        push(self.name.is_some(), "name");
        push(self.cluster_type.is_some(), "clusterType");
        push(self.replication_specs.is_some(), "replicationSpecs");
        push(self.paused.is_some(), "paused");
        push(self.backup_enabled.is_some(), "backupEnabled");
        push(self.pit_enabled.is_some(), "pitEnabled");
        push(self.disk_size_gb.is_some(), "diskSizeGB");
        push(self.mongo_db_major_version.is_some(), "mongoDBMajorVersion");
        push(
            self.encryption_at_rest_provider.is_some(),
            "encryptionAtRestProvider",
        );
        push(self.root_cert_type.is_some(), "rootCertType");
        push(self.version_release_system.is_some(), "versionReleaseSystem");
        push(
            self.termination_protection_enabled.is_some(),
            "terminationProtectionEnabled",
        );
        push(self.labels.is_some(), "labels");
        fields
    }
}

/// Next value when it is set and differs from the prior one
fn changed<T: Clone + PartialEq>(prior: &Option<T>, next: &Option<T>) -> Option<T> {
    match next {
        Some(value) if next != prior => Some(value.clone()),
        _ => None,
    }
}

/// Compare two spec lists by their user-authored shape, ignoring
/// remote-assigned ids and container ids
fn same_layout(prior: &[ReplicationSpec], next: &[ReplicationSpec]) -> bool {
    prior.len() == next.len()
        && prior.iter().zip(next).all(|(a, b)| {
            a.effective_zone_name() == b.effective_zone_name()
                && a.num_shards == b.num_shards
                && a.region_configs == b.region_configs
        })
}

/// Provider/instance/region triple of a shared-tier upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub provider_name: String,
    pub instance_size_name: String,
    pub region_name: String,
}

/// Request to move a cluster off the shared tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    /// Cluster name (filled in when the upgrade is submitted)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    pub provider_settings: ProviderSettings,
}
