//! Resource manifest format.
//!
//! ```yaml
//! resources:
//!   - id: minecraft:amethyst_block
//!     aliases: [amethyst, 紫水晶]
//!     category: block
//!     safety_class: common   # optional, defaults to common
//! ```

use crate::error::CatalogError;
use drift_core::{ResourceCategory, SafetyClass, is_canonical_id};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const EMBEDDED_MANIFEST: &str = include_str!("../resources/default_manifest.yaml");

/// One catalog resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Canonical `namespace:id`.
    pub id: String,

    /// Human-language names across languages.
    #[serde(default)]
    pub aliases: Vec<String>,

    pub category: ResourceCategory,

    #[serde(default = "default_safety_class")]
    pub safety_class: SafetyClass,
}

impl ResourceEntry {
    /// Path part of the id (`amethyst_block` for `minecraft:amethyst_block`).
    pub fn path(&self) -> &str {
        self.id.split_once(':').map(|(_, p)| p).unwrap_or(&self.id)
    }
}

fn default_safety_class() -> SafetyClass {
    SafetyClass::Common
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManifest {
    #[serde(default)]
    pub version: Option<String>,

    pub resources: Vec<ResourceEntry>,
}

impl ResourceManifest {
    /// The manifest compiled into the binary.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::from_yaml(EMBEDDED_MANIFEST)
    }

    pub fn from_yaml(content: &str) -> Result<Self, CatalogError> {
        let manifest: Self = serde_yaml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let manifest: Self = serde_json::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Load a manifest, picking the parser from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("json") => Self::from_json(&content),
            _ => Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Ids must be canonical and unique; aliases must be non-blank.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();

        for entry in &self.resources {
            if !is_canonical_id(&entry.id) {
                return Err(CatalogError::InvalidManifest(format!(
                    "resource id '{}' is not a canonical namespace:id",
                    entry.id
                )));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(CatalogError::InvalidManifest(format!(
                    "resource id '{}' is listed more than once",
                    entry.id
                )));
            }
            if entry.aliases.iter().any(|a| a.trim().is_empty()) {
                return Err(CatalogError::InvalidManifest(format!(
                    "resource '{}' has a blank alias",
                    entry.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_manifest_is_valid() {
        let manifest = ResourceManifest::embedded().unwrap();
        assert!(manifest.resources.len() > 20);

        let tnt = manifest
            .resources
            .iter()
            .find(|e| e.id == "minecraft:tnt")
            .unwrap();
        assert_eq!(tnt.safety_class, SafetyClass::Forbidden);

        let stand = manifest
            .resources
            .iter()
            .find(|e| e.id == "minecraft:armor_stand")
            .unwrap();
        assert_eq!(stand.category, ResourceCategory::Entity);
        assert_eq!(stand.safety_class, SafetyClass::Common);
    }

    #[test]
    fn rejects_non_canonical_id() {
        let err = ResourceManifest::from_yaml(
            "resources:\n  - id: stone\n    category: block\n",
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(_)));
    }

    #[test]
    fn rejects_duplicate_id() {
        let err = ResourceManifest::from_yaml(
            r#"
resources:
  - id: minecraft:stone
    category: block
  - id: minecraft:stone
    category: block
"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidManifest(msg) if msg.contains("more than once")));
    }

    #[test]
    fn from_file_picks_parser_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("manifest.json");
        fs::write(
            &json,
            r#"{"resources":[{"id":"minecraft:glass","aliases":["玻璃"],"category":"block"}]}"#,
        )
        .unwrap();
        let manifest = ResourceManifest::from_file(&json).unwrap();
        assert_eq!(manifest.resources[0].path(), "glass");

        let txt = dir.path().join("manifest.txt");
        fs::write(&txt, "resources: []").unwrap();
        assert!(matches!(
            ResourceManifest::from_file(&txt),
            Err(CatalogError::UnsupportedFormat(_))
        ));
    }
}
