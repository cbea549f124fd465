//! Creation plans and their steps.

use crate::patch::{ExecutionTier, PatchTemplate};
use crate::resource::MaterialResolution;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of world mutation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    BlockPlacement,
    EntitySpawn,
    Effect,
    Generic,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BlockPlacement => "block_placement",
            Self::EntitySpawn => "entity_spawn",
            Self::Effect => "effect",
            Self::Generic => "generic",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Fully resolved and ready for validation.
    Resolved,
    /// Needs the player to clarify something first.
    NeedsReview,
    /// Placeholder produced for non-creation input.
    Draft,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Stable id of the form `step-<n>`, 1-based.
    pub step_id: String,
    pub step_type: StepType,
    #[serde(default)]
    pub required_resource: Option<String>,
    pub status: StepStatus,
    pub description: String,
}

/// Structured plan derived from a creation decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationPlan {
    /// Dominant verb; `create` is the sentinel for non-creation input.
    pub action: String,
    pub summary: String,
    pub confidence: f64,
    pub materials: Vec<MaterialResolution>,
    pub unresolved_tokens: Vec<String>,
    pub steps: Vec<PlanStep>,
    pub patch_templates: Vec<PatchTemplate>,
    #[serde(default)]
    pub notes: Vec<String>,
    pub execution_tier: ExecutionTier,
    #[serde(default)]
    pub unsafe_steps: Vec<String>,
}

impl CreationPlan {
    /// Most restrictive tier across `templates`.
    ///
    /// A plan without templates has nothing that could run unattended and is
    /// reported as `needs_confirm`.
    pub fn aggregate_tier(templates: &[PatchTemplate]) -> ExecutionTier {
        templates
            .iter()
            .map(PatchTemplate::tier)
            .max()
            .unwrap_or(ExecutionTier::NeedsConfirm)
    }

    /// Step ids whose template is not `safe_auto`, in plan order.
    pub fn collect_unsafe_steps(templates: &[PatchTemplate]) -> Vec<String> {
        templates
            .iter()
            .filter(|t| t.tier() != ExecutionTier::SafeAuto)
            .map(|t| t.step_id.clone())
            .collect()
    }

    /// Recompute `execution_tier` and `unsafe_steps` from the templates.
    pub fn refresh_aggregates(&mut self) {
        self.execution_tier = Self::aggregate_tier(&self.patch_templates);
        self.unsafe_steps = Self::collect_unsafe_steps(&self.patch_templates);
    }

    pub fn template_for_step(&self, step_id: &str) -> Option<&PatchTemplate> {
        self.patch_templates.iter().find(|t| t.step_id == step_id)
    }
}
