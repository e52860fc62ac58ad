//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown operation state: '{state}'")]
    UnknownState { state: String },

    #[error("Invalid cluster configuration: {message}")]
    Validation { message: String },

    #[error("Import format error: to import a cluster, use the format {{project_id}}-{{name}} (got '{id}')")]
    InvalidImportId { id: String },

    #[error("Failed to parse cluster document: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
