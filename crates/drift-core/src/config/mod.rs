//! Configuration types for the DriftSystem creation pipeline.
//!
//! Configuration is a single YAML document (`drift.yaml`). Every section and
//! every field is optional; missing values fall back to the defaults below.
//!
//! ```yaml
//! catalog:
//!   manifest_path: resources/manifest.yaml
//! policy:
//!   player_radius: 32
//! executor:
//!   plugin_timeout_ms: 5000
//! transaction_log:
//!   directory: data/transactions
//! ```

pub mod executor;
pub mod policy;
pub mod transaction_log;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use executor::ExecutorConfig;
pub use policy::PolicyConfig;
pub use transaction_log::TransactionLogConfig;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub intent: IntentConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub transaction_log: TransactionLogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Resource catalog configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// External manifest (YAML or JSON). The embedded manifest is used when unset.
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
}

/// Intent classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentConfig {
    /// Score at or above which an utterance counts as a creation request.
    #[serde(default = "default_creation_threshold")]
    pub creation_threshold: f64,

    /// Longer messages are rejected as bad input.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

impl Default for IntentConfig {
    fn default() -> Self {
        Self {
            creation_threshold: default_creation_threshold(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_creation_threshold() -> f64 {
    0.45
}

fn default_max_message_chars() -> usize {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl DriftConfig {
    /// Load configuration from a YAML file.
    ///
    /// A relative `catalog.manifest_path` is resolved against the directory
    /// containing the config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(manifest) = &config.catalog.manifest_path {
            if manifest.is_relative() {
                config.catalog.manifest_path = Some(base_dir.join(manifest));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Reject values that would make the pipeline misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.intent.creation_threshold) {
            return Err(ConfigError::Invalid(format!(
                "intent.creation_threshold must be within [0, 1], got {}",
                self.intent.creation_threshold
            )));
        }
        if !unit.contains(&self.policy.confirm_confidence) {
            return Err(ConfigError::Invalid(format!(
                "policy.confirm_confidence must be within [0, 1], got {}",
                self.policy.confirm_confidence
            )));
        }
        if self.policy.player_radius <= 0 {
            return Err(ConfigError::Invalid(format!(
                "policy.player_radius must be positive, got {}",
                self.policy.player_radius
            )));
        }
        if self.policy.low_risk_volume > self.policy.medium_risk_volume {
            return Err(ConfigError::Invalid(
                "policy.low_risk_volume must not exceed policy.medium_risk_volume".to_string(),
            ));
        }
        if self.executor.plugin_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "executor.plugin_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
