//! Import command - adopt an existing cluster into local state

use console::style;

use super::Session;
use crate::error::{CliError, Result};
use crate::state::StateRecord;

pub async fn run(id: &str, session: &Session) -> Result<()> {
    let (config, state) = session.client.import(id).await?;

    if session.store.load(&config.project_id, &config.name)?.is_some() {
        println!(
            "{} Replacing existing state for {}",
            style("!").yellow(),
            style(&config.name).cyan()
        );
    }

    let zones = state.cluster.replication_specs.len();
    let path = session.store.save(&StateRecord::new(config.clone(), state))?;

    println!(
        "{} Imported cluster {} ({} zone(s))",
        style("✓").green().bold(),
        style(&config.name).cyan(),
        zones
    );
    println!("  State saved to {}", style(path.display()).dim());
    println!("\nCluster document:\n");
    let document = serde_yaml::to_string(&config).map_err(|e| CliError::internal(e.to_string()))?;
    print!("{document}");
    Ok(())
}
