//! Resource vocabulary: categories, safety classes and token resolutions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether `s` has the shape `namespace:path` with lowercase resource-location characters.
pub fn is_canonical_id(s: &str) -> bool {
    let Some((namespace, path)) = s.split_once(':') else {
        return false;
    };
    let ns_ok = !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'));
    let path_ok = !path.is_empty()
        && path.chars().all(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.' | '/')
        });
    ns_ok && path_ok
}

/// What kind of game object a canonical resource id names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Block,
    Item,
    Entity,
    /// Status effects (`minecraft:night_vision`, ...).
    Effect,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Item => "item",
            Self::Entity => "entity",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How dangerous a resource is to place or spawn in a shared world.
///
/// Ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyClass {
    Common,
    Sensitive,
    Forbidden,
}

impl SafetyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Sensitive => "sensitive",
            Self::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for SafetyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of looking a raw token up in the resource catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Unresolved,
    Ambiguous,
}

/// A single material token and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialResolution {
    /// The token as the player supplied it.
    pub token: String,

    /// Canonical `namespace:id`, present only when `status` is `resolved`.
    pub resource_id: Option<String>,

    pub status: ResolutionStatus,

    /// Competing ids when the token is ambiguous.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
}

impl MaterialResolution {
    pub fn resolved(token: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            resource_id: Some(resource_id.into()),
            status: ResolutionStatus::Resolved,
            candidates: Vec::new(),
        }
    }

    pub fn unresolved(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            resource_id: None,
            status: ResolutionStatus::Unresolved,
            candidates: Vec::new(),
        }
    }

    pub fn ambiguous(token: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            token: token.into(),
            resource_id: None,
            status: ResolutionStatus::Ambiguous,
            candidates,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}
