//! CLI error types with exit code handling
//!
//! Every command returns a [`CliError`], which renders as a miette
//! diagnostic and carries the process exit code.

use clusterform_core::CoreError;
use clusterform_provider::ProviderError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Cluster document or identifier rejected before any remote call
    #[error("Validation failed: {message}")]
    #[diagnostic(code(clusterform::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The control plane rejected a request
    #[error("Remote error: {message}")]
    #[diagnostic(code(clusterform::cli::remote))]
    Remote {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Waiting for the cluster ran out of time
    #[error("{message}")]
    #[diagnostic(
        code(clusterform::cli::timeout),
        help("raise the matching entry under `timeouts:` in the cluster document")
    )]
    Timeout { message: String },

    /// Local state record problem
    #[error("State error: {message}")]
    #[diagnostic(code(clusterform::cli::state))]
    State {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Interrupted by the user
    #[error("Interrupted: {message}")]
    #[diagnostic(code(clusterform::cli::interrupted))]
    Interrupted { message: String },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(clusterform::cli::io))]
    Io { message: String },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(clusterform::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Remote { .. } => exit_codes::REMOTE_ERROR,
            CliError::Timeout { .. } => exit_codes::TIMEOUT,
            CliError::State { .. } => exit_codes::STATE_ERROR,
            CliError::Interrupted { .. } => exit_codes::INTERRUPTED,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a state error with help text
    pub fn state_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::internal(err.to_string())
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io(e) => e.into(),
            CoreError::YamlParse(e) => CliError::Validation {
                message: format!("cluster document is not valid YAML: {e}"),
                help: None,
            },
            CoreError::InvalidImportId { .. } => CliError::Validation {
                message: err.to_string(),
                help: Some("example: 5f1b2c3d4e5f6a7b8c9d0e1f-orders".to_string()),
            },
            other => CliError::Validation {
                message: other.to_string(),
                help: None,
            },
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Core(e) => e.into(),
            ProviderError::Io(e) => e.into(),
            ProviderError::InvalidConfig(message) => CliError::Validation {
                message,
                help: None,
            },
            ProviderError::Timeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },
            ProviderError::Cancelled { .. } => CliError::Interrupted {
                message: err.to_string(),
            },
            ProviderError::ClusterNotFound { .. } => CliError::Remote {
                message: err.to_string(),
                help: Some("check the project id and cluster name".to_string()),
            },
            ProviderError::Api(ref api) if api.status() == Some(401) => CliError::Remote {
                message: err.to_string(),
                help: Some(
                    "set CLUSTERFORM_PUBLIC_KEY and CLUSTERFORM_PRIVATE_KEY, or add credentials to the config file"
                        .to_string(),
                ),
            },
            other => CliError::Remote {
                message: other.to_string(),
                help: None,
            },
        }
    }
}
