//! Subcommand implementations. Every command prints JSON to stdout; logs go
//! to stderr.

pub mod check;
pub mod log;
pub mod plan;
pub mod resolve;

use anyhow::{Context, Result};
use drift_catalog::ResourceCatalog;
use drift_core::DriftConfig;
use drift_runtime::CreationPipeline;
use serde::Serialize;
use std::sync::Arc;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

pub(crate) fn load_catalog(config: &DriftConfig) -> Result<Arc<ResourceCatalog>> {
    let catalog = ResourceCatalog::from_optional_path(config.catalog.manifest_path.clone())
        .context("failed to load resource manifest")?;
    Ok(Arc::new(catalog))
}

pub(crate) async fn load_pipeline(config: &DriftConfig) -> Result<CreationPipeline> {
    CreationPipeline::from_config(config)
        .await
        .context("failed to start creation pipeline")
}
