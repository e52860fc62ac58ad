//! Apply command - create or update a cluster and record the result

use clusterform_core::{ClusterConfig, validate_config};
use clusterform_provider::Plan;
use console::style;
use std::path::Path;

use super::Session;
use crate::error::Result;
use crate::state::StateRecord;

pub async fn run(file: &Path, session: &Session) -> Result<()> {
    let config = ClusterConfig::load_from(file)?;
    validate_config(&config)?;

    let prior = session.store.load(&config.project_id, &config.name)?;
    let state = match prior {
        None => {
            println!(
                "{} Creating cluster {} (this can take a while)",
                style("→").cyan(),
                style(&config.name).cyan()
            );
            session.client.create(&config).await?
        }
        Some(record) => {
            if Plan::compute(&record.config, &config).is_no_change() {
                println!(
                    "{} Cluster {} is up to date",
                    style("✓").green(),
                    style(&config.name).cyan()
                );
                return Ok(());
            }
            println!(
                "{} Updating cluster {}",
                style("→").cyan(),
                style(&config.name).cyan()
            );
            session.client.update(&record.config, &config).await?
        }
    };

    let state_name = state.cluster.state_name.clone();
    let record = StateRecord::new(state.applied_config(&config), state);
    let path = session.store.save(&record)?;

    println!(
        "{} Cluster {} is {}",
        style("✓").green().bold(),
        style(&config.name).cyan(),
        style(state_name).green()
    );
    println!("  State saved to {}", style(path.display()).dim());
    Ok(())
}
