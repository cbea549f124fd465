//! # drift-catalog
//!
//! Maps raw material tokens, possibly multilingual, to canonical Minecraft
//! resource ids together with their category and safety class.
//!
//! ## Matching order
//!
//! | Priority | Match                      | Multiple hits |
//! |----------|----------------------------|---------------|
//! | 1        | exact canonical id         | n/a           |
//! | 2        | exact alias                | `ambiguous`   |
//! | 3        | lowercased alias           | `ambiguous`   |
//! | 4        | partial substring of alias | `ambiguous`   |
//!
//! The catalog is read-mostly. [`ResourceCatalog::invalidate`] reloads the
//! manifest as a whole under an exclusive lock.
//!
//! ```rust
//! use drift_catalog::ResourceCatalog;
//! use drift_core::ResolutionStatus;
//!
//! let catalog = ResourceCatalog::embedded().unwrap();
//! let resolution = catalog.resolve("紫水晶");
//! assert_eq!(resolution.status, ResolutionStatus::Resolved);
//! assert_eq!(resolution.resource_id.as_deref(), Some("minecraft:amethyst_block"));
//! ```

pub mod catalog;
pub mod error;
pub mod manifest;

pub use catalog::{ManifestSource, ResourceCatalog};
pub use error::CatalogError;
pub use manifest::{ResourceEntry, ResourceManifest};
