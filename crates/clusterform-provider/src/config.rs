//! Provider configuration and API credentials
//!
//! Stored at `~/.config/clusterform/config.yaml`:
//!
//! ```yaml
//! baseUrl: https://cloud.mongodb.com
//! requestTimeout: 60s
//! credentials:
//!   type: env
//!   publicKeyVar: ATLAS_PUBLIC_KEY
//!   privateKeyVar: ATLAS_PRIVATE_KEY
//! ```
//!
//! `CLUSTERFORM_BASE_URL`, `CLUSTERFORM_PUBLIC_KEY` and
//! `CLUSTERFORM_PRIVATE_KEY` override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ProviderError, Result};

pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com";

pub const ENV_BASE_URL: &str = "CLUSTERFORM_BASE_URL";
pub const ENV_PUBLIC_KEY: &str = "CLUSTERFORM_PUBLIC_KEY";
pub const ENV_PRIVATE_KEY: &str = "CLUSTERFORM_PRIVATE_KEY";

/// Connection settings for the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,

    /// Per-request timeout (not the operation budget)
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            credentials: None,
            request_timeout: default_request_timeout(),
        }
    }
}

impl ProviderConfig {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        Ok(config.with_overrides(|name| std::env::var(name).ok()))
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ProviderError::InvalidConfig("could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("clusterform").join("config.yaml"))
    }

    /// Apply overrides from a variable lookup (the process environment in `load`)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let (Some(public_key), Some(private_key)) =
            (lookup(ENV_PUBLIC_KEY), lookup(ENV_PRIVATE_KEY))
        {
            self.credentials = Some(Credentials::basic(public_key, private_key));
        }
        self
    }
}

/// API key credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Programmatic API key pair
    #[serde(rename_all = "camelCase")]
    Basic {
        public_key: String,
        private_key: String,
    },

    /// Service account access token
    Bearer { token: String },

    /// Environment variable references (CI/CD friendly)
    #[serde(rename_all = "camelCase")]
    Env {
        public_key_var: String,
        private_key_var: String,
    },
}

impl Credentials {
    pub fn basic(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Credentials::Basic {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credentials::Bearer {
            token: token.into(),
        }
    }

    /// Resolve credentials to actual values
    pub fn resolve(&self) -> Result<ResolvedCredentials> {
        match self {
            Credentials::Basic {
                public_key,
                private_key,
            } => Ok(ResolvedCredentials::Basic {
                public_key: public_key.clone(),
                private_key: private_key.clone(),
            }),
            Credentials::Bearer { token } => Ok(ResolvedCredentials::Bearer {
                token: token.clone(),
            }),
            Credentials::Env {
                public_key_var,
                private_key_var,
            } => {
                let read = |var: &str| {
                    std::env::var(var).map_err(|_| {
                        ProviderError::InvalidConfig(format!("environment variable {var} not set"))
                    })
                };
                Ok(ResolvedCredentials::Basic {
                    public_key: read(public_key_var)?,
                    private_key: read(private_key_var)?,
                })
            }
        }
    }
}

/// Resolved credentials ready for use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCredentials {
    Basic {
        public_key: String,
        private_key: String,
    },
    Bearer {
        token: String,
    },
}

impl ResolvedCredentials {
    /// Authorization header value
    pub fn auth_header(&self) -> String {
        match self {
            ResolvedCredentials::Basic {
                public_key,
                private_key,
            } => {
                let encoded = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{public_key}:{private_key}"),
                );
                format!("Basic {encoded}")
            }
            ResolvedCredentials::Bearer { token } => format!("Bearer {token}"),
        }
    }
}
