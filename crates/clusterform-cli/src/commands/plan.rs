//! Plan command - show what apply would do, without calling the control plane

use clusterform_core::{ClusterConfig, validate_config};
use console::style;
use std::path::Path;

use crate::display::render_plan;
use crate::error::Result;
use crate::state::StateStore;

pub fn run(file: &Path, store: &StateStore) -> Result<()> {
    let config = ClusterConfig::load_from(file)?;
    validate_config(&config)?;

    let prior = store.load(&config.project_id, &config.name)?;
    if let Some(record) = &prior {
        println!(
            "{}",
            style(format!(
                "last applied {}",
                record.applied_at.format("%Y-%m-%d %H:%M:%S")
            ))
            .dim()
        );
    }

    print!("{}", render_plan(&config, prior.as_ref().map(|r| &r.config)));
    Ok(())
}
