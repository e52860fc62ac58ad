//! Destroy command - delete a cluster and forget its state

use clusterform_core::ClusterConfig;
use clusterform_provider::ProviderError;
use console::style;

use super::Session;
use crate::error::Result;

pub async fn run(project_id: &str, name: &str, retain_backups: bool, session: &Session) -> Result<()> {
    let mut config = match session.store.load(project_id, name)? {
        Some(record) => record.config,
        None => {
            // Never applied from here; rebuild a document from the remote
            let state = session
                .client
                .read(project_id, name, None)
                .await?
                .ok_or_else(|| ProviderError::ClusterNotFound {
                    project_id: project_id.to_string(),
                    name: name.to_string(),
                })?;
            ClusterConfig::from_description(project_id, &state.cluster)
        }
    };
    if retain_backups {
        config.retain_backups_enabled = Some(true);
    }

    println!(
        "{} Deleting cluster {}",
        style("→").cyan(),
        style(name).cyan()
    );
    session.client.delete(&config).await?;
    session.store.remove(project_id, name)?;

    println!(
        "{} Cluster {} deleted",
        style("✓").green().bold(),
        style(name).cyan()
    );
    if config.retain_backups_enabled == Some(true) {
        println!("  Backups were retained");
    }
    Ok(())
}
