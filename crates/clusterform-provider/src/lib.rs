//! Clusterform Provider - Cluster lifecycle reconciliation against the control plane
//!
//! This crate drives a managed database cluster to its declared shape:
//!
//! - **Spec matching**: Re-order remote replication specs to follow the user's declaration
//! - **Convergence polling**: Wait for a cluster to settle, with bounded backoff and timeouts
//! - **Conflict-aware updates**: Resume paused clusters, retry, and pause last
//! - **Upgrade selection**: Route shared-tier size changes through the upgrade endpoint
//!
//! All remote access goes through the [`ClusterApi`] trait, with an HTTP
//! implementation for real use and an in-memory mock for tests.

pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod poller;
pub mod updater;
pub mod upgrade;

pub use api::{ClusterApi, DeleteOptions, HttpClusterApi, MockClusterApi, OperationCounts, RecordedCall};
pub use config::{Credentials, ProviderConfig, ResolvedCredentials};
pub use error::{ApiError, ApiResult, PAUSED_CONFLICT_CODE, ProviderError, Result};
pub use lifecycle::{ClusterClient, ClusterState, Plan};
pub use matcher::{ContainerIndex, assign_known_ids, reconcile_replication_specs};
pub use poller::{Observation, WaitProfile, await_state, classify};
pub use updater::{Attempt, RetryPolicy, Updater};
pub use upgrade::{execute_upgrade, select_upgrade_path};
