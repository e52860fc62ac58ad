//! Per-operation time budgets

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Time budgets for create, update and delete, independently configurable
///
/// ```yaml
/// timeouts:
///   create: 2h
///   delete: 45m
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeouts {
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub create: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub update: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub delete: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(3 * 60 * 60)
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: default_timeout(),
            update: default_timeout(),
            delete: default_timeout(),
        }
    }
}
