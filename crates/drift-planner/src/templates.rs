//! World patch and undo patch synthesis per step kind.

use drift_core::{
    CoordinateSource, Coordinates, McPayload, PatchMetadata, WorldPatch,
};

pub const AIR: &str = "minecraft:air";

/// Effect duration in seconds for generated `effect give` commands.
pub const EFFECT_SECONDS: u32 = 30;

/// Position argument of a generated command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Explicit(Coordinates),
    /// Offset along x from the player, `~n ~ ~`.
    Relative(i64),
}

impl Placement {
    pub fn command_args(&self) -> String {
        match self {
            Self::Explicit(c) => c.to_string(),
            Self::Relative(0) => "~ ~ ~".to_string(),
            Self::Relative(dx) => format!("~{} ~ ~", dx),
        }
    }

    fn apply_to(&self, metadata: &mut PatchMetadata) {
        match self {
            Self::Explicit(c) => {
                metadata.coordinates = Some(*c);
                metadata.source = Some(CoordinateSource::ExplicitCoordinates);
            }
            Self::Relative(_) => {
                metadata.source = Some(CoordinateSource::Relative);
            }
        }
    }
}

/// Identity of the step a patch belongs to.
#[derive(Debug, Clone)]
pub struct StepRef<'a> {
    pub step_id: &'a str,
    pub template_id: &'a str,
    pub description: &'a str,
}

impl<'a> StepRef<'a> {
    pub fn new(step_id: &'a str, template_id: &'a str, description: &'a str) -> Self {
        Self {
            step_id,
            template_id,
            description,
        }
    }

    fn metadata(&self) -> PatchMetadata {
        PatchMetadata {
            step_id: self.step_id.to_string(),
            template_id: self.template_id.to_string(),
            step_description: self.description.to_string(),
            ..Default::default()
        }
    }

    fn patch(&self, commands: Vec<String>) -> WorldPatch {
        WorldPatch {
            mc: McPayload {
                commands,
                ..Default::default()
            },
            metadata: self.metadata(),
        }
    }

    /// Entity tag that scopes the undo `kill` to what this template summoned.
    pub fn entity_tag(&self) -> String {
        format!("drift_{}", self.template_id)
    }
}

/// `setblock` of `block_id`, undone by setting the same position to air.
pub fn block_placement(
    step: &StepRef<'_>,
    block_id: &str,
    placement: Placement,
) -> (WorldPatch, Option<WorldPatch>) {
    let pos = placement.command_args();
    let mut forward = step.patch(vec![format!("setblock {} {}", pos, block_id)]);
    forward.metadata.block_id = Some(block_id.to_string());
    placement.apply_to(&mut forward.metadata);

    let mut undo = step.patch(vec![format!("setblock {} {}", pos, AIR)]);
    undo.metadata.block_id = Some(AIR.to_string());
    placement.apply_to(&mut undo.metadata);

    (forward, Some(undo))
}

/// Clearing a block to air. What was there before is unknown, so there is
/// no undo.
pub fn block_removal(step: &StepRef<'_>, block_id: &str, placement: Placement) -> WorldPatch {
    let mut forward = step.patch(vec![format!(
        "setblock {} {}",
        placement.command_args(),
        AIR
    )]);
    forward.metadata.block_id = Some(AIR.to_string());
    forward
        .metadata
        .extra
        .insert("cleared_block".to_string(), serde_json::Value::from(block_id));
    placement.apply_to(&mut forward.metadata);
    forward
}

/// `summon` with a per-template tag, undone by killing entities with that tag.
pub fn entity_spawn(
    step: &StepRef<'_>,
    entity_id: &str,
    placement: Placement,
) -> (WorldPatch, Option<WorldPatch>) {
    let tag = step.entity_tag();
    let mut forward = step.patch(vec![format!(
        "summon {} {} {{Tags:[\"{}\"]}}",
        entity_id,
        placement.command_args(),
        tag
    )]);
    placement.apply_to(&mut forward.metadata);

    let undo = step.patch(vec![format!("kill @e[type={},tag={}]", entity_id, tag)]);
    (forward, Some(undo))
}

/// `effect give` on the nearest player, undone by `effect clear`.
pub fn status_effect(step: &StepRef<'_>, effect_id: &str) -> (WorldPatch, Option<WorldPatch>) {
    let forward = step.patch(vec![format!(
        "effect give @p {} {} 0",
        effect_id, EFFECT_SECONDS
    )]);
    let undo = step.patch(vec![format!("effect clear @p {}", effect_id)]);
    (forward, Some(undo))
}

/// Non-executable patch that only talks to the player.
pub fn review(step: &StepRef<'_>, tell: String, give_item: Option<String>) -> WorldPatch {
    let mut patch = step.patch(Vec::new());
    patch.mc.tell = Some(tell);
    patch.mc.give_item = give_item;
    patch
}
