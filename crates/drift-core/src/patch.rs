//! World patches, patch templates and their validation verdicts.

use crate::plan::{StepStatus, StepType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// An absolute block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Coordinates {
    pub fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Where a template's position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSource {
    /// The player typed an `x y z` triple.
    ExplicitCoordinates,
    /// Position is relative to the player (`~ ~ ~`).
    Relative,
}

/// The JSON envelope sent to the Minecraft plugin.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPatch {
    pub mc: McPayload,
    #[serde(default)]
    pub metadata: PatchMetadata,
}

impl WorldPatch {
    pub fn with_commands(commands: Vec<String>) -> Self {
        Self {
            mc: McPayload {
                commands,
                ..Default::default()
            },
            metadata: PatchMetadata::default(),
        }
    }

    /// A patch is empty when it carries nothing for the plugin to do.
    pub fn is_empty(&self) -> bool {
        self.mc.commands.is_empty() && self.mc.tell.is_none() && self.mc.give_item.is_none()
    }
}

/// Game-facing part of a world patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McPayload {
    #[serde(default)]
    pub commands: Vec<String>,

    /// Optional chat line shown to the player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tell: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub give_item: Option<String>,
}

/// Bookkeeping attached to a world patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchMetadata {
    #[serde(default)]
    pub step_id: String,

    #[serde(default)]
    pub template_id: String,

    #[serde(default)]
    pub step_description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<CoordinateSource>,

    /// Fields this version does not know about, preserved on round-trip.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Whether a template may run without a human in the loop.
///
/// Ordered from least to most restrictive, so the aggregate tier of a plan
/// is the maximum over its templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionTier {
    SafeAuto,
    NeedsConfirm,
    Blocked,
}

impl ExecutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SafeAuto => "safe_auto",
            Self::NeedsConfirm => "needs_confirm",
            Self::Blocked => "blocked",
        }
    }

    /// The more restrictive of two tiers.
    pub fn at_least(self, floor: ExecutionTier) -> ExecutionTier {
        self.max(floor)
    }
}

impl fmt::Display for ExecutionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough estimate of how much of the world a template touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldDamageRisk {
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for WorldDamageRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// Verdict of the patch validator for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionValidation {
    pub execution_tier: ExecutionTier,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub world_damage_risk: WorldDamageRisk,
    pub requires_confirmation: bool,
}

impl Default for ExecutionValidation {
    /// An unvalidated template is never auto-executable.
    fn default() -> Self {
        Self {
            execution_tier: ExecutionTier::NeedsConfirm,
            errors: Vec::new(),
            warnings: Vec::new(),
            world_damage_risk: WorldDamageRisk::None,
            requires_confirmation: true,
        }
    }
}

/// A draft world patch bound to one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchTemplate {
    pub template_id: String,
    pub step_id: String,
    pub status: StepStatus,
    pub summary: String,
    pub step_type: StepType,
    pub world_patch: WorldPatch,

    /// Patch that restores the state before `world_patch` ran.
    #[serde(default)]
    pub undo_patch: Option<WorldPatch>,

    #[serde(default)]
    pub validation: ExecutionValidation,

    #[serde(default)]
    pub notes: Vec<String>,
}

impl PatchTemplate {
    pub fn tier(&self) -> ExecutionTier {
        self.validation.execution_tier
    }

    pub fn commands(&self) -> &[String] {
        &self.world_patch.mc.commands
    }

    pub fn has_undo(&self) -> bool {
        self.undo_patch
            .as_ref()
            .is_some_and(|undo| !undo.mc.commands.is_empty())
    }
}
