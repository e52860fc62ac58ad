//! Local validation of cluster documents and identifiers
//!
//! Everything here runs before any remote call, so a bad document never
//! leaves a half-created cluster behind.

use regex::Regex;
use std::sync::LazyLock;

use crate::cluster::ClusterConfig;
use crate::error::{CoreError, Result};
use crate::spec::ReplicationSpec;

static IMPORT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^([0-9a-fA-F]{24})-(.*)$").expect("import id pattern is valid")
});

/// Split an import identifier of the form `<project_id>-<name>`
pub fn parse_import_id(id: &str) -> Result<(String, String)> {
    let caps = IMPORT_ID
        .captures(id)
        .ok_or_else(|| CoreError::InvalidImportId { id: id.to_string() })?;

    let name = &caps[2];
    if name.is_empty() {
        return Err(CoreError::InvalidImportId { id: id.to_string() });
    }
    Ok((caps[1].to_string(), name.to_string()))
}

/// Validate a desired cluster document
pub fn validate_config(config: &ClusterConfig) -> Result<()> {
    if config.name.trim().is_empty() {
        return Err(CoreError::validation("`name` must not be empty"));
    }
    if config.project_id.trim().is_empty() {
        return Err(CoreError::validation("`projectId` must not be empty"));
    }
    if config.replication_specs.is_empty() {
        return Err(CoreError::validation(
            "at least one replication spec is required",
        ));
    }

    for (i, spec) in config.replication_specs.iter().enumerate() {
        if spec.num_shards == 0 {
            return Err(CoreError::validation(format!(
                "replicationSpecs[{i}].numShards must be positive"
            )));
        }
        if spec.region_configs.is_empty() {
            return Err(CoreError::validation(format!(
                "replicationSpecs[{i}] must declare at least one region config"
            )));
        }
        for (j, region) in spec.region_configs.iter().enumerate() {
            if region.backing_provider_name.is_some() && !region.is_tenant() {
                return Err(CoreError::validation(format!(
                    "replicationSpecs[{i}].regionConfigs[{j}].backingProviderName is only valid with providerName TENANT"
                )));
            }
            if region.is_tenant() && region.backing_provider_name.is_none() {
                return Err(CoreError::validation(format!(
                    "replicationSpecs[{i}].regionConfigs[{j}] uses TENANT without backingProviderName"
                )));
            }
            let blocks = [
                ("electableSpecs", &region.electable_specs),
                ("readOnlySpecs", &region.read_only_specs),
                ("analyticsSpecs", &region.analytics_specs),
            ];
            for (field, block) in blocks {
                if block.as_ref().is_some_and(|node| node.instance_size.trim().is_empty()) {
                    return Err(CoreError::validation(format!(
                        "replicationSpecs[{i}].regionConfigs[{j}].{field}.instanceSize must not be empty"
                    )));
                }
            }
        }
    }

    check_priority_order(&config.replication_specs)
}

/// Region priorities within a replication spec must be non-increasing
pub fn check_priority_order(specs: &[ReplicationSpec]) -> Result<()> {
    for (i, spec) in specs.iter().enumerate() {
        let ordered = spec
            .region_configs
            .windows(2)
            .all(|pair| pair[0].priority >= pair[1].priority);
        if !ordered {
            return Err(CoreError::validation(format!(
                "priority values in replicationSpecs[{i}].regionConfigs must be in descending order"
            )));
        }
    }
    Ok(())
}
