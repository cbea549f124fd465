//! Decision -> plan transformation.

use crate::templates::{self, Placement, StepRef};
use drift_catalog::ResourceCatalog;
use drift_core::{
    Coordinates, CreationIntentDecision, CreationPlan, ExecutionTier, ExecutionValidation,
    MaterialResolution, PatchTemplate, PlanStep, ResolutionStatus, ResourceCategory,
    SafetyClass, StepStatus, StepType, WorldPatch, WorldState,
};
use drift_intent::extract_coordinates;
use drift_intent::lexicon::CLEARING_ACTIONS;
use drift_policy::{PatchValidator, ValidationContext};
use std::sync::Arc;

/// Plans below this confidence never run unattended.
pub const LOW_CONFIDENCE_FLOOR: f64 = 0.45;

/// Action recorded for non-creation input and verbless requests.
pub const DEFAULT_ACTION: &str = "create";

const NO_INTENT_SUMMARY: &str = "未检测到创造意图";
const ASK_FOR_MATERIAL: &str = "请指定要使用的材料";

/// A step plus the template drafted for it, before validation.
struct Draft {
    step: PlanStep,
    world_patch: WorldPatch,
    undo_patch: Option<WorldPatch>,
    safety_class: Option<SafetyClass>,
    notes: Vec<String>,
}

/// Builds creation plans. Pure apart from catalog reads.
pub struct PlanTransformer {
    catalog: Arc<ResourceCatalog>,
    validator: Arc<PatchValidator>,
}

impl PlanTransformer {
    pub fn new(catalog: Arc<ResourceCatalog>, validator: Arc<PatchValidator>) -> Self {
        Self { catalog, validator }
    }

    pub fn validator(&self) -> &PatchValidator {
        &self.validator
    }

    /// Transform a decision into a plan.
    ///
    /// `message` is the raw utterance, searched for an explicit coordinate
    /// triple. `world` supplies the player position for proximity checks.
    pub fn transform(
        &self,
        decision: &CreationIntentDecision,
        message: Option<&str>,
        world: Option<&WorldState>,
    ) -> CreationPlan {
        let player_position = world.and_then(|w| w.position);

        let materials: Vec<MaterialResolution> = decision
            .slots
            .materials
            .iter()
            .map(|token| self.catalog.resolve(token))
            .collect();

        let mut notes = Vec::new();
        let mut unresolved_tokens = Vec::new();
        for resolution in &materials {
            match resolution.status {
                ResolutionStatus::Resolved => {}
                ResolutionStatus::Unresolved => {
                    notes.push(format!("材料未识别: {}", resolution.token));
                    unresolved_tokens.push(resolution.token.clone());
                }
                ResolutionStatus::Ambiguous => {
                    notes.push(format!(
                        "材料存在歧义: {} ({})",
                        resolution.token,
                        resolution.candidates.join(", ")
                    ));
                    unresolved_tokens.push(resolution.token.clone());
                }
            }
        }

        if !decision.is_creation {
            return self.draft_plan(decision, materials, unresolved_tokens);
        }

        let confidence = adjusted_confidence(decision.confidence, &materials);
        let action = decision
            .slots
            .actions
            .first()
            .cloned()
            .unwrap_or_else(|| DEFAULT_ACTION.to_string());
        let clearing = CLEARING_ACTIONS.contains(&action.as_str());
        let explicit = message
            .and_then(extract_coordinates)
            .or_else(|| coordinates_slot(decision));

        let drafts = if materials.is_empty() {
            vec![Draft::review(1, ASK_FOR_MATERIAL.to_string(), None)]
        } else {
            self.draft_steps(&materials, explicit, clearing)
        };

        let mut patch_templates = Vec::with_capacity(drafts.len());
        let mut steps = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let template = self.finish_template(&draft, confidence, player_position);
            steps.push(draft.step);
            patch_templates.push(template);
        }

        let resolved_ids: Vec<&str> = materials
            .iter()
            .filter_map(|m| m.resource_id.as_deref())
            .collect();
        let summary = if resolved_ids.is_empty() {
            format!("{}: {}", action, ASK_FOR_MATERIAL)
        } else {
            format!("{}: {}", action, resolved_ids.join(", "))
        };

        let mut plan = CreationPlan {
            action,
            summary,
            confidence,
            materials,
            unresolved_tokens,
            steps,
            patch_templates,
            notes,
            execution_tier: ExecutionTier::NeedsConfirm,
            unsafe_steps: Vec::new(),
        };
        plan.refresh_aggregates();

        tracing::debug!(
            summary = %plan.summary,
            tier = %plan.execution_tier,
            templates = plan.patch_templates.len(),
            unresolved = plan.unresolved_tokens.len(),
            "Plan built"
        );

        plan
    }

    /// Placeholder plan for input that is not a creation request. Mentioned
    /// materials are still reported, but nothing is drafted for them.
    fn draft_plan(
        &self,
        decision: &CreationIntentDecision,
        materials: Vec<MaterialResolution>,
        unresolved_tokens: Vec<String>,
    ) -> CreationPlan {
        let step = PlanStep {
            step_id: step_id(1),
            step_type: StepType::Generic,
            required_resource: None,
            status: StepStatus::Draft,
            description: NO_INTENT_SUMMARY.to_string(),
        };
        let template = PatchTemplate {
            template_id: template_id(&step.step_id),
            step_id: step.step_id.clone(),
            status: StepStatus::Draft,
            summary: NO_INTENT_SUMMARY.to_string(),
            step_type: StepType::Generic,
            world_patch: WorldPatch::default(),
            undo_patch: None,
            validation: ExecutionValidation::default(),
            notes: Vec::new(),
        };

        let mut plan = CreationPlan {
            action: DEFAULT_ACTION.to_string(),
            summary: NO_INTENT_SUMMARY.to_string(),
            confidence: decision.confidence,
            materials,
            unresolved_tokens,
            steps: vec![step],
            patch_templates: vec![template],
            notes: decision.reasons.clone(),
            execution_tier: ExecutionTier::NeedsConfirm,
            unsafe_steps: Vec::new(),
        };
        plan.refresh_aggregates();
        plan
    }

    fn draft_steps(
        &self,
        materials: &[MaterialResolution],
        explicit: Option<Coordinates>,
        clearing: bool,
    ) -> Vec<Draft> {
        let mut drafts = Vec::with_capacity(materials.len());
        let mut explicit = explicit;
        let mut next_offset = 1;
        // Explicit coordinates go to the first block step only.
        let mut placement = |block: bool| {
            if let Some(at) = explicit.filter(|_| block) {
                explicit = None;
                return Placement::Explicit(at);
            }
            let dx = next_offset;
            next_offset += 1;
            Placement::Relative(dx)
        };

        for (index, resolution) in materials.iter().enumerate() {
            let n = index + 1;
            let Some(id) = resolution.resource_id.as_deref() else {
                let tell = match resolution.status {
                    ResolutionStatus::Ambiguous => format!(
                        "材料存在歧义: {}，可选: {}",
                        resolution.token,
                        resolution.candidates.join(", ")
                    ),
                    _ => format!("材料未识别: {}", resolution.token),
                };
                drafts.push(Draft::review(n, tell, None));
                continue;
            };

            let safety = self.catalog.safety_class_of(id);
            let sid = step_id(n);
            let tid = template_id(&sid);

            let draft = match self.catalog.category_of(id) {
                Some(ResourceCategory::Block) if clearing => {
                    let description = format!("移除 {}", id);
                    let patch = templates::block_removal(
                        &StepRef::new(&sid, &tid, &description),
                        id,
                        placement(true),
                    );
                    let mut draft =
                        Draft::resolved(n, StepType::BlockPlacement, id, description, patch, None);
                    draft.notes.push("原方块状态未知，无法生成撤销补丁".to_string());
                    draft
                }
                Some(ResourceCategory::Block) => {
                    let description = format!("放置 {}", id);
                    let (patch, undo) = templates::block_placement(
                        &StepRef::new(&sid, &tid, &description),
                        id,
                        placement(true),
                    );
                    Draft::resolved(n, StepType::BlockPlacement, id, description, patch, undo)
                }
                // Clearing an entity or effect has no tag-guarded command, so it
                // becomes a review step instead of a forward patch.
                Some(ResourceCategory::Entity) if clearing => Draft::clearing(
                    n,
                    StepType::EntitySpawn,
                    id,
                    format!("移除实体 {} 需要确认后手动处理", id),
                ),
                Some(ResourceCategory::Effect) if clearing => Draft::clearing(
                    n,
                    StepType::Effect,
                    id,
                    format!("清除效果 {} 需要确认后手动处理", id),
                ),
                Some(ResourceCategory::Entity) => {
                    let description = format!("召唤 {}", id);
                    let (patch, undo) = templates::entity_spawn(
                        &StepRef::new(&sid, &tid, &description),
                        id,
                        placement(false),
                    );
                    Draft::resolved(n, StepType::EntitySpawn, id, description, patch, undo)
                }
                Some(ResourceCategory::Effect) => {
                    let description = format!("施加效果 {}", id);
                    let (patch, undo) =
                        templates::status_effect(&StepRef::new(&sid, &tid, &description), id);
                    Draft::resolved(n, StepType::Effect, id, description, patch, undo)
                }
                Some(ResourceCategory::Item) | None => Draft::review(
                    n,
                    format!("物品 {} 需要确认后发放", id),
                    Some(id.to_string()),
                ),
            };
            drafts.push(Draft { safety_class: safety, ..draft });
        }

        drafts
    }

    /// Build the template for a draft and run it through the validator.
    fn finish_template(
        &self,
        draft: &Draft,
        confidence: f64,
        player_position: Option<Coordinates>,
    ) -> PatchTemplate {
        let step = &draft.step;
        let mut template = PatchTemplate {
            template_id: template_id(&step.step_id),
            step_id: step.step_id.clone(),
            status: step.status,
            summary: step.description.clone(),
            step_type: step.step_type,
            world_patch: draft.world_patch.clone(),
            undo_patch: draft.undo_patch.clone(),
            validation: ExecutionValidation::default(),
            notes: draft.notes.clone(),
        };

        let context = ValidationContext {
            confidence,
            safety_class: draft.safety_class,
            requires_confirmation: step.status != StepStatus::Resolved,
            player_position,
        };
        self.validator.validate(&mut template, &context);

        if confidence < LOW_CONFIDENCE_FLOOR {
            let validation = &mut template.validation;
            validation.execution_tier = validation
                .execution_tier
                .at_least(ExecutionTier::NeedsConfirm);
            validation.requires_confirmation =
                validation.execution_tier == ExecutionTier::NeedsConfirm;
        }

        template
    }
}

impl Draft {
    fn resolved(
        n: usize,
        step_type: StepType,
        resource_id: &str,
        description: String,
        world_patch: WorldPatch,
        undo_patch: Option<WorldPatch>,
    ) -> Self {
        Self {
            step: PlanStep {
                step_id: step_id(n),
                step_type,
                required_resource: Some(resource_id.to_string()),
                status: StepStatus::Resolved,
                description,
            },
            world_patch,
            undo_patch,
            safety_class: None,
            notes: Vec::new(),
        }
    }

    /// Review step for removing a non-block resource. Carries no commands.
    fn clearing(n: usize, step_type: StepType, resource_id: &str, tell: String) -> Self {
        let mut draft = Self::review(n, tell, None);
        draft.step.step_type = step_type;
        draft.step.required_resource = Some(resource_id.to_string());
        draft
    }

    fn review(n: usize, tell: String, give_item: Option<String>) -> Self {
        let step = PlanStep {
            step_id: step_id(n),
            step_type: StepType::Generic,
            required_resource: give_item.clone(),
            status: StepStatus::NeedsReview,
            description: tell.clone(),
        };
        let tpl_id = template_id(&step.step_id);
        let world_patch = templates::review(
            &StepRef::new(&step.step_id, &tpl_id, &step.description),
            tell,
            give_item,
        );
        Self {
            step,
            world_patch,
            undo_patch: None,
            safety_class: None,
            notes: Vec::new(),
        }
    }
}

fn step_id(n: usize) -> String {
    format!("step-{}", n)
}

fn template_id(step_id: &str) -> String {
    format!("tpl-{}", step_id)
}

/// Decision confidence scaled down by the share of unresolved materials.
fn adjusted_confidence(confidence: f64, materials: &[MaterialResolution]) -> f64 {
    if materials.is_empty() {
        return confidence;
    }
    let resolved = materials.iter().filter(|m| m.is_resolved()).count() as f64;
    let ratio = resolved / materials.len() as f64;
    ((confidence * (0.5 + 0.5 * ratio)) * 10_000.0).round() / 10_000.0
}

/// Coordinates the classifier already put into the slots.
fn coordinates_slot(decision: &CreationIntentDecision) -> Option<Coordinates> {
    decision
        .slots
        .extra
        .get("coordinates")
        .and_then(|value| serde_json::from_value(value.clone()).ok())
}
