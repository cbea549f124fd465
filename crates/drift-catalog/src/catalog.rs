//! The process-wide resource catalog.

use crate::error::CatalogError;
use crate::manifest::{ResourceEntry, ResourceManifest};
use drift_core::{MaterialResolution, ResourceCategory, SafetyClass, is_canonical_id};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard};

/// Where the catalog loads its manifest from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// The manifest compiled into the binary.
    Embedded,
    /// A YAML or JSON file on disk.
    File(PathBuf),
    /// A manifest supplied in memory (tests, tooling).
    Inline(ResourceManifest),
}

impl ManifestSource {
    fn load(&self) -> Result<ResourceManifest, CatalogError> {
        match self {
            Self::Embedded => ResourceManifest::embedded(),
            Self::File(path) => ResourceManifest::from_file(path),
            Self::Inline(manifest) => {
                manifest.validate()?;
                Ok(manifest.clone())
            }
        }
    }
}

/// Lookup tables built from one manifest.
#[derive(Debug, Default)]
struct CatalogIndex {
    entries: HashMap<String, ResourceEntry>,
    /// Alias as written in the manifest -> ids.
    exact: HashMap<String, Vec<String>>,
    /// Lowercased alias -> ids.
    folded: HashMap<String, Vec<String>>,
}

impl CatalogIndex {
    fn build(manifest: ResourceManifest) -> Self {
        let mut index = Self::default();

        for entry in manifest.resources {
            let mut names: Vec<String> = entry.aliases.clone();
            names.push(entry.path().to_string());
            // "amethyst_block" is also reachable as "amethyst block".
            names.push(entry.path().replace('_', " "));

            for name in names {
                let name = name.trim().to_string();
                push_unique(index.exact.entry(name.clone()).or_default(), &entry.id);
                push_unique(index.folded.entry(name.to_lowercase()).or_default(), &entry.id);
            }

            index.entries.insert(entry.id.clone(), entry);
        }

        index
    }

    fn resolve(&self, token: &str) -> MaterialResolution {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return MaterialResolution::unresolved(token);
        }
        let folded = trimmed.to_lowercase();

        if is_canonical_id(&folded) {
            return match self.entries.get(&folded) {
                Some(entry) => MaterialResolution::resolved(token, entry.id.clone()),
                None => MaterialResolution::unresolved(token),
            };
        }

        if let Some(ids) = self.exact.get(trimmed) {
            return from_candidates(token, ids.clone());
        }

        if let Some(ids) = self.folded.get(&folded) {
            return from_candidates(token, ids.clone());
        }

        // Partial match in either direction: "紫水晶块" contains "紫水晶",
        // "lantern" is contained in "soul lantern".
        let mut ids = BTreeSet::new();
        for (alias, alias_ids) in &self.folded {
            if alias.chars().count() < 2 {
                continue;
            }
            if alias.contains(&folded) || folded.contains(alias.as_str()) {
                ids.extend(alias_ids.iter().cloned());
            }
        }
        from_candidates(token, ids.into_iter().collect())
    }
}

fn push_unique(ids: &mut Vec<String>, id: &str) {
    if !ids.iter().any(|existing| existing == id) {
        ids.push(id.to_string());
    }
}

fn from_candidates(token: &str, mut ids: Vec<String>) -> MaterialResolution {
    match ids.len() {
        0 => MaterialResolution::unresolved(token),
        1 => MaterialResolution::resolved(token, ids.remove(0)),
        _ => {
            ids.sort();
            MaterialResolution::ambiguous(token, ids)
        }
    }
}

/// Token -> canonical resource mapping.
///
/// Readers share the index; [`invalidate`](Self::invalidate) swaps it under
/// the write lock, so a resolve never sees a half-built index.
pub struct ResourceCatalog {
    source: ManifestSource,
    index: RwLock<CatalogIndex>,
}

impl ResourceCatalog {
    /// Load a catalog from `source`.
    pub fn load(source: ManifestSource) -> Result<Self, CatalogError> {
        let manifest = source.load()?;
        let index = CatalogIndex::build(manifest);
        tracing::debug!(resources = index.entries.len(), "Resource catalog loaded");

        Ok(Self {
            source,
            index: RwLock::new(index),
        })
    }

    /// Catalog backed by the embedded manifest.
    pub fn embedded() -> Result<Self, CatalogError> {
        Self::load(ManifestSource::Embedded)
    }

    /// Catalog backed by `path`, or the embedded manifest when `None`.
    pub fn from_optional_path(path: Option<PathBuf>) -> Result<Self, CatalogError> {
        match path {
            Some(path) => Self::load(ManifestSource::File(path)),
            None => Self::embedded(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogIndex> {
        // The index is replaced wholesale, so a poisoned lock still guards a
        // complete index.
        self.index.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Resolve a raw player token.
    pub fn resolve(&self, token: &str) -> MaterialResolution {
        self.read().resolve(token)
    }

    pub fn category_of(&self, resource_id: &str) -> Option<ResourceCategory> {
        self.read().entries.get(resource_id).map(|e| e.category)
    }

    pub fn safety_class_of(&self, resource_id: &str) -> Option<SafetyClass> {
        self.read().entries.get(resource_id).map(|e| e.safety_class)
    }

    pub fn entry(&self, resource_id: &str) -> Option<ResourceEntry> {
        self.read().entries.get(resource_id).cloned()
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.read().entries.contains_key(resource_id)
    }

    /// Every lowercased alias the catalog knows, longest first.
    ///
    /// Used to spot material names inside unsegmented utterances.
    pub fn aliases(&self) -> Vec<String> {
        let index = self.read();
        let mut aliases: Vec<String> = index.folded.keys().cloned().collect();
        aliases.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        aliases
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reload the manifest and swap the index.
    ///
    /// On failure the previous index stays in place.
    pub fn invalidate(&self) -> Result<(), CatalogError> {
        let manifest = match self.source.load() {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(error = %e, "Catalog reload failed, keeping previous index");
                return Err(e);
            }
        };
        let fresh = CatalogIndex::build(manifest);

        let mut index = self
            .index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *index = fresh;
        tracing::info!(resources = index.entries.len(), "Resource catalog reloaded");
        Ok(())
    }
}
