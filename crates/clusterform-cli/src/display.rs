//! Plain-text rendering of plans and regions
//!
//! Kept free of terminal styling so the output can be snapshot-tested.

use clusterform_core::{ClusterConfig, RegionConfig, ReplicationSpec};
use clusterform_provider::Plan;
use std::fmt::Write;

/// One line per region: provider, region, electable hardware, priority
pub fn region_summary(region: &RegionConfig) -> String {
    let mut line = match &region.backing_provider_name {
        Some(backing) => format!("{}({}) {}", region.provider_name, backing, region.region_name),
        None => format!("{} {}", region.provider_name, region.region_name),
    };
    if let Some(size) = region.electable_instance_size() {
        line.push(' ');
        line.push_str(size);
    }
    if let Some(count) = region.electable_specs.as_ref().and_then(|s| s.node_count) {
        let _ = write!(line, " x{count}");
    }
    let _ = write!(line, " [priority {}]", region.priority);
    line
}

fn zone_label(spec: &ReplicationSpec) -> String {
    if spec.num_shards > 1 {
        format!("zone '{}' ({} shards)", spec.effective_zone_name(), spec.num_shards)
    } else {
        format!("zone '{}'", spec.effective_zone_name())
    }
}

fn write_layout(out: &mut String, specs: &[ReplicationSpec]) {
    for spec in specs {
        let _ = writeln!(out, "    {}", zone_label(spec));
        for region in &spec.region_configs {
            let _ = writeln!(out, "      {}", region_summary(region));
        }
    }
}

/// Describe what `apply` would do for `next`, given the last-applied document
pub fn render_plan(next: &ClusterConfig, prior: Option<&ClusterConfig>) -> String {
    let mut out = String::new();

    let Some(prior) = prior else {
        let _ = writeln!(
            out,
            "+ create cluster '{}' in project {}",
            next.name, next.project_id
        );
        let _ = writeln!(out, "    type: {}", next.cluster_type);
        write_layout(&mut out, &next.replication_specs);
        if next.paused {
            let _ = writeln!(out, "    then: pause");
        }
        return out;
    };

    match Plan::compute(prior, next) {
        Plan::NoChange => {
            let _ = writeln!(out, "= cluster '{}' is up to date", next.name);
        }
        Plan::Upgrade(request) => {
            let settings = &request.provider_settings;
            let _ = writeln!(out, "~ upgrade cluster '{}' off the shared tier", next.name);
            let _ = writeln!(
                out,
                "    to: {} {} in {}",
                settings.provider_name, settings.instance_size_name, settings.region_name
            );
        }
        Plan::Update { patch, pause_after } => {
            let _ = writeln!(out, "~ update cluster '{}'", next.name);
            let fields = patch.changed_fields();
            if !fields.is_empty() {
                let _ = writeln!(out, "    changed: {}", fields.join(", "));
            }
            if patch.replication_specs.is_some() {
                write_layout(&mut out, &next.replication_specs);
            }
            if pause_after {
                let _ = writeln!(out, "    then: pause");
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(size: &str, disk: f64, paused: bool) -> ClusterConfig {
        let mut config = ClusterConfig::from_yaml(&format!(
            r#"
projectId: 5f1b2c3d4e5f6a7b8c9d0e1f
name: orders
clusterType: REPLICASET
diskSizeGB: {disk}
replicationSpecs:
  - zoneName: Zone 1
    regionConfigs:
      - providerName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: {size}
          nodeCount: 3
"#
        ))
        .unwrap();
        config.paused = paused;
        config
    }

    fn shared() -> ClusterConfig {
        ClusterConfig::from_yaml(
            r#"
projectId: 5f1b2c3d4e5f6a7b8c9d0e1f
name: orders
replicationSpecs:
  - zoneName: Zone 1
    regionConfigs:
      - providerName: TENANT
        backingProviderName: AWS
        regionName: US_EAST_1
        priority: 7
        electableSpecs:
          instanceSize: M2
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_render_create() {
        let output = render_plan(&config("M10", 40.0, true), None);
        insta::assert_snapshot!(output, @r"
        + create cluster 'orders' in project 5f1b2c3d4e5f6a7b8c9d0e1f
            type: REPLICASET
            zone 'Zone 1'
              AWS US_EAST_1 M10 x3 [priority 7]
            then: pause
        ");
    }

    #[test]
    fn test_render_no_change() {
        let output = render_plan(&config("M10", 40.0, false), Some(&config("M10", 40.0, false)));
        insta::assert_snapshot!(output, @"= cluster 'orders' is up to date");
    }

    #[test]
    fn test_render_update() {
        let output = render_plan(&config("M20", 80.0, false), Some(&config("M10", 40.0, true)));
        insta::assert_snapshot!(output, @r"
        ~ update cluster 'orders'
            changed: replicationSpecs, paused, diskSizeGB
            zone 'Zone 1'
              AWS US_EAST_1 M20 x3 [priority 7]
        ");
    }

    #[test]
    fn test_render_pause_only() {
        let output = render_plan(&config("M10", 40.0, true), Some(&config("M10", 40.0, false)));
        insta::assert_snapshot!(output, @r"
        ~ update cluster 'orders'
            then: pause
        ");
    }

    #[test]
    fn test_render_upgrade() {
        let output = render_plan(&config("M10", 40.0, false), Some(&shared()));
        insta::assert_snapshot!(output, @r"
        ~ upgrade cluster 'orders' off the shared tier
            to: AWS M10 in US_EAST_1
        ");
    }

    #[test]
    fn test_region_summary_tenant() {
        let config = shared();
        assert_eq!(
            region_summary(&config.replication_specs[0].region_configs[0]),
            "TENANT(AWS) US_EAST_1 M2 [priority 7]"
        );
    }
}
