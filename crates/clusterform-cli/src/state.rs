//! Local last-applied state
//!
//! One JSON record per cluster under `<root>/<project_id>/<name>.json`,
//! holding the applied cluster document (with remote-assigned replication
//! spec ids) and the merged read-back.

use chrono::{DateTime, Utc};
use clusterform_core::ClusterConfig;
use clusterform_provider::ClusterState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{CliError, Result};

/// What `apply` and `import` leave behind for the next run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRecord {
    pub config: ClusterConfig,
    pub state: ClusterState,
    pub applied_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn new(config: ClusterConfig, state: ClusterState) -> Self {
        Self {
            config,
            state,
            applied_at: Utc::now(),
        }
    }
}

/// File-backed state store
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store under the platform data directory
    pub fn default_location() -> Result<Self> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            CliError::state_with_help(
                "could not determine data directory",
                "pass --state-dir or set CLUSTERFORM_STATE_DIR",
            )
        })?;
        Ok(Self::new(data_dir.join("clusterform").join("state")))
    }

    fn record_path(&self, project_id: &str, name: &str) -> PathBuf {
        self.root.join(project_id).join(format!("{name}.json"))
    }

    /// Load the record for a cluster, if one was saved
    pub fn load(&self, project_id: &str, name: &str) -> Result<Option<StateRecord>> {
        let path = self.record_path(project_id, name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let record = serde_json::from_str(&content).map_err(|e| {
            CliError::state_with_help(
                format!("cannot read {}: {e}", path.display()),
                "remove the file and run `clusterform import` to rebuild it",
            )
        })?;
        Ok(Some(record))
    }

    pub fn save(&self, record: &StateRecord) -> Result<PathBuf> {
        let path = self.record_path(&record.config.project_id, &record.config.name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so an interrupted save leaves the old record intact
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(record)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Forget a cluster; returns whether a record existed
    pub fn remove(&self, project_id: &str, name: &str) -> Result<bool> {
        let path = self.record_path(project_id, name);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }
}
