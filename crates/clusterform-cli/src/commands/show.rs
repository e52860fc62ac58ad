//! Show command - read a cluster and print the merged view

use clusterform_provider::{ClusterState, ProviderError};
use console::style;

use super::Session;
use crate::display::region_summary;
use crate::error::Result;

pub async fn run(project_id: &str, name: &str, output_json: bool, session: &Session) -> Result<()> {
    // Shape the remote specs after the last-applied document when there is one
    let record = session.store.load(project_id, name)?;
    let desired = record.as_ref().map(|r| r.config.replication_specs.as_slice());

    let state = session
        .client
        .read(project_id, name, desired)
        .await?
        .ok_or_else(|| ProviderError::ClusterNotFound {
            project_id: project_id.to_string(),
            name: name.to_string(),
        })?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    print_cluster(&state);
    Ok(())
}

fn print_cluster(state: &ClusterState) {
    let cluster = &state.cluster;

    println!("{}", style("CLUSTER").bold().underlined());
    println!("  Name:       {}", style(&cluster.name).cyan());
    println!("  Project:    {}", style(&state.project_id).yellow());

    let state_style = match state.state() {
        Some(s) if s.is_terminal() => style(cluster.state_name.clone()).green(),
        Some(_) => style(cluster.state_name.clone()).yellow(),
        None => style(cluster.state_name.clone()).red(),
    };
    println!("  State:      {}", state_style);
    if cluster.paused == Some(true) {
        println!("  Paused:     {}", style("yes").yellow());
    }
    if let Some(cluster_type) = &cluster.cluster_type {
        println!("  Type:       {}", cluster_type);
    }
    if let Some(version) = &cluster.mongo_db_version {
        println!("  Version:    {}", version);
    }
    if let Some(disk) = cluster.disk_size_gb {
        println!("  Disk:       {} GB", disk);
    }
    if let Some(created) = &cluster.create_date {
        println!("  Created:    {}", created.format("%Y-%m-%d %H:%M:%S"));
    }

    println!("\n{}", style("ZONES").bold().underlined());
    for spec in &cluster.replication_specs {
        println!(
            "  {} {}",
            style(spec.effective_zone_name()).bold(),
            style(format!("({})", spec.id)).dim()
        );
        for region in &spec.region_configs {
            let container = spec
                .container_id
                .get(&region.container_key())
                .map(|id| format!(" container {id}"))
                .unwrap_or_default();
            println!("    {}{}", region_summary(region), style(container).dim());
        }
    }

    if let Some(srv) = cluster
        .connection_strings
        .as_ref()
        .and_then(|c| c.standard_srv.as_ref())
    {
        println!("\n{}", style("CONNECTION").bold().underlined());
        println!("  {}", srv);
    }
}
