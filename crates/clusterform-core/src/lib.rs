//! Clusterform Core - Core types for managed database cluster reconciliation
//!
//! This crate provides the foundational types used throughout Clusterform:
//! - `ReplicationSpec`: Replication/region/node layout of a cluster
//! - `ClusterConfig`: The desired cluster as authored by the user
//! - `ClusterDescription`: A snapshot of the cluster as reported by the control plane
//! - `ClusterRequest`: Create request and sparse update patch
//! - `OperationState`: Closed set of provisioning states
//! - `Timeouts`: Per-operation time budgets

pub mod cluster;
pub mod container;
pub mod error;
pub mod spec;
pub mod state;
pub mod tier;
pub mod timeouts;
pub mod validate;

pub use cluster::{
    ClusterConfig, ClusterDescription, ClusterRequest, ConnectionStrings, ProviderSettings,
    UpgradeRequest,
};
pub use container::{Container, resolve_container_id};
pub use error::{CoreError, Result};
pub use spec::{AutoScaling, DEFAULT_ZONE_NAME, NodeSpec, RegionConfig, ReplicationSpec};
pub use state::OperationState;
pub use tier::{SHARED_TIERS, is_shared_tier};
pub use timeouts::Timeouts;
pub use validate::{parse_import_id, validate_config};
