//! Replication, region, and node specifications
//!
//! The same shapes are used for the user-authored desired list and for the
//! list the control plane returns. A desired spec has an empty `id` until it
//! has been applied once; a remote spec always carries one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Zone name the control plane stores when the user leaves it unset
///
/// Kept byte-for-byte for wire compatibility: clusters created by earlier
/// tooling carry this literal, and their specs must still match by zone name.
pub const DEFAULT_ZONE_NAME: &str = "ZoneName managed by Terraform";

/// Provider name used by shared-tier (tenant) clusters
pub const TENANT_PROVIDER: &str = "TENANT";

/// One replication spec: a zone with its shards and region layout
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSpec {
    /// Opaque remote identifier (empty until first applied)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// User-assigned zone name
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub zone_name: String,

    /// Number of shards in this zone
    #[serde(default = "default_num_shards")]
    pub num_shards: u32,

    /// Region layout, in the order the user declared it
    #[serde(default)]
    pub region_configs: Vec<RegionConfig>,

    /// Network container ids keyed by `PROVIDER:REGION` (read-only, filled on read)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub container_id: BTreeMap<String, String>,
}

fn default_num_shards() -> u32 {
    1
}

impl ReplicationSpec {
    /// Whether this spec has been assigned a remote identifier
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// Zone name as sent to the control plane
    pub fn effective_zone_name(&self) -> &str {
        if self.zone_name.is_empty() {
            DEFAULT_ZONE_NAME
        } else {
            &self.zone_name
        }
    }

    /// Copy of this spec shaped as a request body: read-only fields stripped,
    /// unset zone name replaced with the default
    pub fn to_request(&self) -> Self {
        Self {
            id: self.id.clone(),
            zone_name: self.effective_zone_name().to_string(),
            num_shards: self.num_shards,
            region_configs: self.region_configs.clone(),
            container_id: BTreeMap::new(),
        }
    }
}

/// Placement of a replication spec in one provider region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionConfig {
    /// Cloud provider (AWS, GCP, AZURE, or TENANT)
    pub provider_name: String,

    /// Underlying provider of a TENANT cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing_provider_name: Option<String>,

    /// Provider region
    pub region_name: String,

    /// Election priority, used by the remote for failover ordering
    #[serde(default)]
    pub priority: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub electable_specs: Option<NodeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only_specs: Option<NodeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_specs: Option<NodeSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<AutoScaling>,
}

impl RegionConfig {
    pub fn is_tenant(&self) -> bool {
        self.provider_name == TENANT_PROVIDER
    }

    /// Key used for container id lookups
    pub fn container_key(&self) -> String {
        format!("{}:{}", self.provider_name, self.region_name)
    }

    /// Electable instance size, if any
    pub fn electable_instance_size(&self) -> Option<&str> {
        self.electable_specs
            .as_ref()
            .map(|s| s.instance_size.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// Hardware of one node class (electable, read-only, or analytics)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    #[serde(default)]
    pub instance_size: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_count: Option<u32>,

    /// Provisioned IOPS (AWS only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_iops: Option<i64>,

    /// EBS volume type (AWS only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ebs_volume_type: Option<String>,
}

/// Auto-scaling policy of a region
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScaling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_gb_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_scale_down_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_min_instance_size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_max_instance_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_zone_name_defaults() {
        let spec = ReplicationSpec::default();
        assert_eq!(spec.effective_zone_name(), DEFAULT_ZONE_NAME);

        let spec = ReplicationSpec {
            zone_name: "Zone EU".to_string(),
            ..Default::default()
        };
        assert_eq!(spec.effective_zone_name(), "Zone EU");
    }

    #[test]
    fn test_to_request_strips_container_ids() {
        let mut spec = ReplicationSpec {
            id: "abc".to_string(),
            ..Default::default()
        };
        spec.container_id
            .insert("AWS:US_EAST_1".to_string(), "c1".to_string());

        let request = spec.to_request();
        assert!(request.container_id.is_empty());
        assert_eq!(request.id, "abc");
        assert_eq!(request.zone_name, DEFAULT_ZONE_NAME);
    }

    #[test]
    fn test_deserialize_defaults() {
        let yaml = r#"
zoneName: Zone 1
regionConfigs:
  - providerName: AWS
    regionName: US_EAST_1
    priority: 7
    electableSpecs:
      instanceSize: M10
      nodeCount: 3
"#;
        let spec: ReplicationSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.num_shards, 1);
        assert!(!spec.has_id());
        assert_eq!(spec.region_configs.len(), 1);

        let region = &spec.region_configs[0];
        assert_eq!(region.container_key(), "AWS:US_EAST_1");
        assert_eq!(region.electable_instance_size(), Some("M10"));
        assert!(region.read_only_specs.is_none());
    }

    #[test]
    fn test_electable_instance_size_empty_is_none() {
        let region = RegionConfig {
            electable_specs: Some(NodeSpec::default()),
            ..Default::default()
        };
        assert_eq!(region.electable_instance_size(), None);
    }
}
