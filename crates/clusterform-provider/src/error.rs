//! Error types for clusterform-provider

use clusterform_core::{CoreError, OperationState};
use std::time::Duration;
use thiserror::Error;

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Result type for remote API calls
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Error code the control plane returns when a mutation hits a paused cluster
pub const PAUSED_CONFLICT_CODE: &str = "CANNOT_UPDATE_PAUSED_CLUSTER";

/// Errors returned by the remote control plane client
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    /// The control plane answered with an error status
    #[error("HTTP {status} {}: {detail}", .error_code.as_deref().unwrap_or("UNKNOWN_ERROR"))]
    Remote {
        status: u16,
        error_code: Option<String>,
        detail: String,
    },

    /// No response was obtained (connection failure, reset, TLS, decode)
    #[error("transport error: {message}")]
    Transport { message: String },
}

impl ApiError {
    /// Build a remote error
    pub fn remote(status: u16, error_code: Option<&str>, detail: impl Into<String>) -> Self {
        ApiError::Remote {
            status,
            error_code: error_code.map(str::to_string),
            detail: detail.into(),
        }
    }

    /// Build a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::Transport {
            message: message.into(),
        }
    }

    /// HTTP status, when a response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Remote error code, when present
    pub fn error_code(&self) -> Option<&str> {
        match self {
            ApiError::Remote { error_code, .. } => error_code.as_deref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }

    pub fn is_service_unavailable(&self) -> bool {
        self.status() == Some(503)
    }

    /// Whether a long-lived connection was dropped by the peer
    pub fn is_connection_reset(&self) -> bool {
        match self {
            ApiError::Transport { message } => {
                let message = message.to_lowercase();
                message.contains("reset by peer")
                    || message.contains("connection reset")
                    || message.contains("broken pipe")
            }
            _ => false,
        }
    }

    /// Whether the mutation was rejected because the cluster is paused
    pub fn is_paused_conflict(&self) -> bool {
        self.error_code() == Some(PAUSED_CONFLICT_CODE)
    }
}

/// Errors that can occur during cluster lifecycle operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Error reported by the control plane, message preserved verbatim
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The time budget ran out before the cluster settled
    #[error("timeout while waiting for cluster '{name}' after {elapsed:?} (budget {budget:?}){}", .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    Timeout {
        name: String,
        elapsed: Duration,
        budget: Duration,
        detail: Option<String>,
    },

    /// A known state outside both the pending and target sets
    #[error("cluster '{name}' entered unexpected state '{state}', wanted one of [{expected}]")]
    UnexpectedState {
        name: String,
        state: OperationState,
        expected: String,
    },

    /// A state string outside the known state set
    #[error("cluster '{name}' reported unknown state '{state}'")]
    UnknownState { name: String, state: String },

    /// The enclosing operation was cancelled
    #[error("operation on cluster '{name}' was cancelled")]
    Cancelled { name: String },

    /// Resuming a paused cluster failed
    #[error("failed to resume paused cluster '{name}': {source}")]
    CorrectionFailed {
        name: String,
        #[source]
        source: Box<ProviderError>,
    },

    /// Cluster does not exist
    #[error("cluster '{name}' not found in project '{project_id}'")]
    ClusterNotFound { project_id: String, name: String },

    /// Invalid local configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Core model error (validation, parsing)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        ProviderError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for ProviderError {
    fn from(e: serde_yaml::Error) -> Self {
        ProviderError::Serialization(e.to_string())
    }
}

impl ProviderError {
    /// The underlying remote error, if this is one
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ProviderError::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Check if this is a remote 404
    pub fn is_not_found(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_not_found)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}
