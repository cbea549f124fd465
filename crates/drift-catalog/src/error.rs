//! Error types for the catalog crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or reloading a manifest.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the manifest file.
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Manifest parsed but violates a structural rule.
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    /// Manifest extension is neither YAML nor JSON.
    #[error("unsupported manifest format: {0}")]
    UnsupportedFormat(PathBuf),
}
