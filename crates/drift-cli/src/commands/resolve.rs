//! `drift resolve`.

use super::{load_catalog, print_json};
use anyhow::Result;
use drift_core::DriftConfig;
use serde_json::json;

pub fn resolve(config: &DriftConfig, tokens: &[String]) -> Result<()> {
    let catalog = load_catalog(config)?;
    let resolutions: Vec<_> = tokens
        .iter()
        .map(|token| {
            let resolution = catalog.resolve(token);
            let entry = resolution
                .resource_id
                .as_deref()
                .and_then(|id| catalog.entry(id));
            json!({
                "resolution": resolution,
                "category": entry.as_ref().map(|e| e.category),
                "safety_class": entry.as_ref().map(|e| e.safety_class),
            })
        })
        .collect();
    print_json(&resolutions)
}
