//! Provisioning states reported by the control plane

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Provisioning state of a cluster
///
/// `Idle` and `Deleted` are the settled states. `Repeating` never comes from
/// the control plane: the poller emits it for a dropped connection so the
/// attempt is retried without being treated as progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationState {
    Creating,
    Updating,
    Repairing,
    Repeating,
    Pending,
    Idle,
    Deleting,
    Deleted,
}

impl OperationState {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Creating => "CREATING",
            OperationState::Updating => "UPDATING",
            OperationState::Repairing => "REPAIRING",
            OperationState::Repeating => "REPEATING",
            OperationState::Pending => "PENDING",
            OperationState::Idle => "IDLE",
            OperationState::Deleting => "DELETING",
            OperationState::Deleted => "DELETED",
        }
    }

    /// Whether this is a settled state
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Idle | OperationState::Deleted)
    }
}

impl FromStr for OperationState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATING" => Ok(OperationState::Creating),
            "UPDATING" => Ok(OperationState::Updating),
            "REPAIRING" => Ok(OperationState::Repairing),
            "REPEATING" => Ok(OperationState::Repeating),
            "PENDING" => Ok(OperationState::Pending),
            "IDLE" => Ok(OperationState::Idle),
            "DELETING" => Ok(OperationState::Deleting),
            "DELETED" => Ok(OperationState::Deleted),
            other => Err(CoreError::UnknownState {
                state: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
