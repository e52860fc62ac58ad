//! Reconciliation of desired replication specs with the remote ones
//!
//! The control plane returns replication specs in its own order, with
//! server-assigned ids, and with optional sub-blocks filled in even where the
//! user left them out. Writing that list back as-is would make every plan show
//! a reorder or a spurious diff, so the remote list is re-ordered to follow the
//! user's declaration order and trimmed to the shape the user authored.
//!
//! There is one output slot per remote entry, and slot `i` pairs with
//! `desired[i]`. Matching runs in two passes:
//! 1. A desired entry claims the first unclaimed remote entry with the same id,
//!    or (when the desired entry has no id yet) with the same zone name.
//! 2. Slots left empty take the remaining remote entries in remote order.
//!
//! Every remote entry appears exactly once in the result.

use clusterform_core::{
    AutoScaling, Container, NodeSpec, RegionConfig, ReplicationSpec, resolve_container_id,
};
use std::collections::HashMap;

/// Provider containers keyed by provider name
pub type ContainerIndex = HashMap<String, Vec<Container>>;

/// Re-order and shape the remote replication specs after the desired ones
///
/// Returns exactly one entry per remote spec. Output slot `i` is paired with
/// `desired[i]`; fields come from the remote spec and desired only decides
/// which optional sub-blocks are kept. With no desired companion a remote
/// spec is returned as reported.
pub fn reconcile_replication_specs(
    desired: &[ReplicationSpec],
    actual: &[ReplicationSpec],
    containers: &ContainerIndex,
) -> Vec<ReplicationSpec> {
    let actual: Vec<&ReplicationSpec> = actual.iter().filter(|a| !is_blank(a)).collect();

    let mut claimed = vec![false; actual.len()];
    let mut slots: Vec<Option<usize>> = vec![None; actual.len()];

    for (i, slot) in slots.iter_mut().enumerate() {
        let Some(wanted) = desired.get(i) else {
            continue;
        };
        let found = actual
            .iter()
            .enumerate()
            .find(|(j, a)| !claimed[*j] && matches(wanted, a))
            .map(|(j, _)| j);
        if let Some(j) = found {
            claimed[j] = true;
            *slot = Some(j);
        }
    }

    // As many empty slots as unclaimed remote specs, so every one is placed
    let mut leftovers = (0..actual.len()).filter(|j| !claimed[*j]);
    for slot in slots.iter_mut().filter(|s| s.is_none()) {
        *slot = leftovers.next();
    }

    slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| {
            slot.map(|j| merge_spec(actual[j], desired.get(i), containers))
        })
        .collect()
}

/// Copy remote ids onto desired specs that have none yet
///
/// Used before building an update patch so the control plane modifies
/// existing zones instead of replacing them.
pub fn assign_known_ids(next: &mut [ReplicationSpec], known: &[ReplicationSpec]) {
    let mut taken: Vec<bool> = known
        .iter()
        .map(|k| next.iter().any(|n| n.has_id() && n.id == k.id))
        .collect();

    for spec in next.iter_mut().filter(|s| !s.has_id()) {
        let found = known
            .iter()
            .enumerate()
            .find(|(j, k)| {
                !taken[*j] && k.has_id() && k.effective_zone_name() == spec.effective_zone_name()
            })
            .map(|(j, _)| j);
        if let Some(j) = found {
            taken[j] = true;
            spec.id = known[j].id.clone();
        }
    }
}

fn is_blank(spec: &ReplicationSpec) -> bool {
    spec.id.is_empty() && spec.zone_name.is_empty() && spec.region_configs.is_empty()
}

fn matches(desired: &ReplicationSpec, actual: &ReplicationSpec) -> bool {
    if desired.has_id() {
        desired.id == actual.id
    } else {
        desired.zone_name == actual.zone_name
    }
}

fn merge_spec(
    actual: &ReplicationSpec,
    desired: Option<&ReplicationSpec>,
    containers: &ContainerIndex,
) -> ReplicationSpec {
    let region_configs = actual
        .region_configs
        .iter()
        .enumerate()
        .map(|(i, region)| {
            let wanted = desired.and_then(|d| d.region_configs.get(i));
            merge_region(region, wanted)
        })
        .collect();

    let container_id = actual
        .region_configs
        .iter()
        .filter(|region| !region.is_tenant())
        .filter_map(|region| {
            let candidates = containers.get(&region.provider_name)?;
            let id = resolve_container_id(candidates, region)?;
            Some((region.container_key(), id.to_string()))
        })
        .collect();

    ReplicationSpec {
        id: actual.id.clone(),
        zone_name: actual.zone_name.clone(),
        num_shards: actual.num_shards,
        region_configs,
        container_id,
    }
}

fn merge_region(actual: &RegionConfig, desired: Option<&RegionConfig>) -> RegionConfig {
    let Some(desired) = desired else {
        return actual.clone();
    };

    let provider = actual.provider_name.as_str();
    let shape = |remote: &Option<NodeSpec>, wanted: &Option<NodeSpec>| {
        wanted
            .as_ref()
            .and_then(|wanted| merge_node(remote.as_ref(), provider, wanted))
    };

    RegionConfig {
        provider_name: actual.provider_name.clone(),
        backing_provider_name: actual.backing_provider_name.clone(),
        region_name: actual.region_name.clone(),
        priority: actual.priority,
        electable_specs: shape(&actual.electable_specs, &desired.electable_specs),
        read_only_specs: shape(&actual.read_only_specs, &desired.read_only_specs),
        analytics_specs: shape(&actual.analytics_specs, &desired.analytics_specs),
        auto_scaling: desired
            .auto_scaling
            .as_ref()
            .and_then(|wanted| merge_auto_scaling(actual.auto_scaling.as_ref(), wanted)),
    }
}

/// Keep the remote auto-scaling values, limited to fields the user set
fn merge_auto_scaling(actual: Option<&AutoScaling>, desired: &AutoScaling) -> Option<AutoScaling> {
    let actual = actual?;
    Some(AutoScaling {
        disk_gb_enabled: desired.disk_gb_enabled.and(actual.disk_gb_enabled),
        compute_enabled: desired.compute_enabled.and(actual.compute_enabled),
        compute_scale_down_enabled: desired
            .compute_scale_down_enabled
            .and(actual.compute_scale_down_enabled),
        compute_min_instance_size: desired
            .compute_min_instance_size
            .as_ref()
            .and(actual.compute_min_instance_size.clone()),
        compute_max_instance_size: desired
            .compute_max_instance_size
            .as_ref()
            .and(actual.compute_max_instance_size.clone()),
    })
}

/// Keep the remote node spec's values, limited to fields the user set
fn merge_node(actual: Option<&NodeSpec>, provider: &str, desired: &NodeSpec) -> Option<NodeSpec> {
    let actual = actual?;
    if desired.instance_size.is_empty() {
        return None;
    }

    let aws = provider == "AWS";
    let disk_iops = match (actual.disk_iops, desired.disk_iops) {
        (Some(remote), Some(wanted)) if aws && remote > 0 && wanted > 0 => Some(remote),
        _ => None,
    };
    let ebs_volume_type = desired
        .ebs_volume_type
        .as_deref()
        .filter(|v| aws && !v.is_empty())
        .and(actual.ebs_volume_type.clone());

    Some(NodeSpec {
        instance_size: actual.instance_size.clone(),
        node_count: desired.node_count.and(actual.node_count),
        disk_iops,
        ebs_volume_type,
    })
}
