//! Template validation and execution tiering.

use crate::command::{CoordToken, ParsedCommand, base_selector, resource_id, within_radius};
use crate::error::CommandIssue;
use crate::risk::{AffectedVolume, risk_for_volume};
use drift_catalog::ResourceCatalog;
use drift_core::{
    Coordinates, ExecutionTier, ExecutionValidation, PatchTemplate, PolicyConfig, SafetyClass,
    WorldDamageRisk, is_canonical_id,
};
use std::sync::Arc;

/// Opcodes (and bare words) that are never allowed anywhere in a command.
const FORBIDDEN_WORDS: &[&str] = &["op", "deop", "stop", "save-all", "gamerule", "worldborder"];

const SETBLOCK_MODES: &[&str] = &["replace", "keep"];
const FILL_MODES: &[&str] = &["replace", "keep", "hollow", "outline"];
const SELF_TARGETS: &[&str] = &["@s", "@p"];

/// Facts about the plan and player that feed tiering.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Plan confidence.
    pub confidence: f64,
    /// Safety class of the material behind the template.
    pub safety_class: Option<SafetyClass>,
    /// Forces at least `needs_confirm`.
    pub requires_confirmation: bool,
    pub player_position: Option<Coordinates>,
}

/// What a whitelisted command touches.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFacts {
    pub opcode: String,
    pub positions: Vec<[CoordToken; 3]>,
    pub volume: Option<AffectedVolume>,
    /// Most sensitive catalog resource the command references.
    pub safety_class: SafetyClass,
    pub warnings: Vec<String>,
}

impl CommandFacts {
    fn new(opcode: &str) -> Self {
        Self {
            opcode: opcode.to_string(),
            positions: Vec::new(),
            volume: None,
            safety_class: SafetyClass::Common,
            warnings: Vec::new(),
        }
    }
}

/// Validates patch templates against the command whitelist and policy bounds.
pub struct PatchValidator {
    catalog: Arc<ResourceCatalog>,
    config: PolicyConfig,
}

impl PatchValidator {
    pub fn new(catalog: Arc<ResourceCatalog>, config: PolicyConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Validate `template`, store the verdict in `template.validation` and
    /// return it.
    ///
    /// An undo patch containing a command outside the undo whitelist is
    /// removed from the template.
    pub fn validate(
        &self,
        template: &mut PatchTemplate,
        context: &ValidationContext,
    ) -> ExecutionValidation {
        let mut errors: Vec<String> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut risk = WorldDamageRisk::None;
        let mut bounded = true;
        let mut safety = context.safety_class.unwrap_or(SafetyClass::Common);

        let commands = template.commands().to_vec();
        if commands.is_empty() {
            warnings.push("no_commands".to_string());
        }

        for command in &commands {
            match self.check_command(command) {
                Ok(facts) => {
                    bounded &= facts.positions.iter().all(|pos| {
                        within_radius(
                            pos,
                            context.player_position.as_ref(),
                            self.config.player_radius,
                        )
                    });
                    if let Some(volume) = facts.volume {
                        risk = risk.max(risk_for_volume(volume, &self.config));
                    }
                    safety = safety.max(facts.safety_class);
                    warnings.extend(facts.warnings);
                }
                Err(issue) => {
                    tracing::debug!(
                        template_id = %template.template_id,
                        kind = %issue.kind,
                        command = %issue.command,
                        "Command rejected"
                    );
                    if !errors.iter().any(|e| e == issue.kind.as_str()) {
                        errors.push(issue.kind.as_str().to_string());
                    }
                    template.notes.push(issue.to_string());
                }
            }
        }

        if let Some(undo) = &template.undo_patch {
            let rejected: Vec<CommandIssue> = undo
                .mc
                .commands
                .iter()
                .filter_map(|cmd| self.check_undo_command(cmd).err())
                .collect();
            if !rejected.is_empty() {
                for issue in &rejected {
                    warnings.push(format!("{}: {}", issue.kind, issue.command));
                }
                template.undo_patch = None;
            }
        }

        let tier = if !errors.is_empty() || safety == SafetyClass::Forbidden {
            ExecutionTier::Blocked
        } else if safety == SafetyClass::Sensitive
            || context.requires_confirmation
            || context.confidence < self.config.confirm_confidence
        {
            ExecutionTier::NeedsConfirm
        } else if !commands.is_empty() && bounded && template.has_undo() {
            ExecutionTier::SafeAuto
        } else {
            ExecutionTier::NeedsConfirm
        };

        let tier = if risk == WorldDamageRisk::High {
            tier.at_least(ExecutionTier::NeedsConfirm)
        } else {
            tier
        };

        if tier == ExecutionTier::NeedsConfirm && !bounded {
            warnings.push("coordinates_outside_player_radius".to_string());
        }

        let validation = ExecutionValidation {
            execution_tier: tier,
            errors,
            warnings,
            world_damage_risk: risk,
            requires_confirmation: tier == ExecutionTier::NeedsConfirm,
        };

        tracing::debug!(
            template_id = %template.template_id,
            tier = %validation.execution_tier,
            risk = %validation.world_damage_risk,
            "Template validated"
        );

        template.validation = validation.clone();
        validation
    }

    /// Whether a single command passes the whitelist and argument checks.
    pub fn is_whitelisted(&self, command: &str) -> bool {
        self.check_command(command).is_ok()
    }

    /// Check one forward command.
    pub fn check_command(&self, command: &str) -> Result<CommandFacts, CommandIssue> {
        let parsed = ParsedCommand::parse(command)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "empty command"))?;

        if let Some(word) = std::iter::once(parsed.opcode.as_str())
            .chain(parsed.args.iter().copied())
            .find(|token| FORBIDDEN_WORDS.contains(&token.to_lowercase().as_str()))
        {
            return Err(CommandIssue::forbidden(command, word));
        }

        match parsed.opcode.as_str() {
            "setblock" => self.check_setblock(&parsed),
            "fill" => self.check_fill(&parsed),
            "summon" => self.check_summon(&parsed),
            "effect" => self.check_effect_give(&parsed),
            "tp" => self.check_tp(&parsed),
            "tellraw" | "title" => {
                if parsed.args.len() < 2 {
                    return Err(CommandIssue::invalid_argument(
                        command,
                        format!("{} needs a target and a payload", parsed.opcode),
                    ));
                }
                Ok(CommandFacts::new(&parsed.opcode))
            }
            other => Err(CommandIssue::not_whitelisted(command, other)),
        }
    }

    /// Check one command of an undo patch.
    ///
    /// Undo patches may only clear what a forward patch created: block
    /// edits, tag-guarded `kill` and `effect clear` on the player.
    pub fn check_undo_command(&self, command: &str) -> Result<(), CommandIssue> {
        let parsed = ParsedCommand::parse(command)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "empty command"))?;

        match parsed.opcode.as_str() {
            "setblock" => self.check_setblock(&parsed).map(|_| ()),
            "fill" => self.check_fill(&parsed).map(|_| ()),
            "kill" => match parsed.args.as_slice() {
                [selector] if selector.starts_with("@e[") && selector.contains("tag=") => Ok(()),
                _ => Err(CommandIssue::undo_not_whitelisted(command)),
            },
            "effect" => match parsed.args.as_slice() {
                ["clear", target, ..] if SELF_TARGETS.contains(&base_selector(target)) => Ok(()),
                _ => Err(CommandIssue::undo_not_whitelisted(command)),
            },
            _ => Err(CommandIssue::undo_not_whitelisted(command)),
        }
    }

    fn check_setblock(&self, parsed: &ParsedCommand<'_>) -> Result<CommandFacts, CommandIssue> {
        let command = parsed.raw;
        if !(4..=5).contains(&parsed.args.len()) {
            return Err(CommandIssue::invalid_argument(
                command,
                "setblock takes <x> <y> <z> <block> [mode]",
            ));
        }
        let position = parsed
            .position(0)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "coordinates"))?;
        let mut facts = CommandFacts::new("setblock");
        facts.safety_class = self.check_block(command, parsed.args[3])?;
        if let Some(mode) = parsed.arg(4) {
            if !SETBLOCK_MODES.contains(&mode) {
                return Err(CommandIssue::invalid_argument(
                    command,
                    format!("setblock mode '{}'", mode),
                ));
            }
        }
        facts.positions.push(position);
        facts.volume = Some(AffectedVolume::Blocks(1));
        Ok(facts)
    }

    fn check_fill(&self, parsed: &ParsedCommand<'_>) -> Result<CommandFacts, CommandIssue> {
        let command = parsed.raw;
        if !(7..=9).contains(&parsed.args.len()) {
            return Err(CommandIssue::invalid_argument(
                command,
                "fill takes <from> <to> <block> [mode]",
            ));
        }
        let from = parsed
            .position(0)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "coordinates"))?;
        let to = parsed
            .position(3)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "coordinates"))?;
        let mut facts = CommandFacts::new("fill");
        facts.safety_class = self.check_block(command, parsed.args[6])?;

        match (parsed.arg(7), parsed.arg(8)) {
            (None, _) => {}
            (Some("replace"), Some(filter)) => {
                self.check_block(command, filter)?;
            }
            (Some(mode), None) if FILL_MODES.contains(&mode) => {}
            (Some(mode), _) => {
                return Err(CommandIssue::invalid_argument(
                    command,
                    format!("fill mode '{}'", mode),
                ));
            }
        }

        facts.positions.push(from);
        facts.positions.push(to);
        facts.volume = Some(AffectedVolume::between(&from, &to));
        Ok(facts)
    }

    fn check_summon(&self, parsed: &ParsedCommand<'_>) -> Result<CommandFacts, CommandIssue> {
        let command = parsed.raw;
        let entity = parsed
            .arg(0)
            .map(resource_id)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "summon needs an entity"))?;
        if !is_canonical_id(entity) {
            return Err(CommandIssue::invalid_argument(
                command,
                format!("entity id '{}' is not namespace:id", entity),
            ));
        }
        let namespace = entity.split(':').next().unwrap_or_default();
        if !self
            .config
            .allowed_entity_namespaces
            .iter()
            .any(|ns| ns == namespace)
        {
            return Err(CommandIssue::entity_forbidden(command, entity));
        }

        let mut facts = CommandFacts::new("summon");
        match self.catalog.safety_class_of(entity) {
            Some(SafetyClass::Forbidden) => {
                return Err(CommandIssue::entity_forbidden(command, entity));
            }
            Some(class) => facts.safety_class = class,
            None => facts
                .warnings
                .push(format!("entity_not_in_catalog: {}", entity)),
        }

        if parsed.args.len() > 1 {
            let position = parsed
                .position(1)
                .ok_or_else(|| CommandIssue::invalid_argument(command, "coordinates"))?;
            facts.positions.push(position);
        }
        Ok(facts)
    }

    fn check_effect_give(&self, parsed: &ParsedCommand<'_>) -> Result<CommandFacts, CommandIssue> {
        let command = parsed.raw;
        if parsed.arg(0) != Some("give") {
            return Err(CommandIssue::not_whitelisted(command, "effect"));
        }
        let target = parsed
            .arg(1)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "effect give needs a target"))?;
        if !SELF_TARGETS.contains(&base_selector(target)) {
            return Err(CommandIssue::target_not_allowed(command, target));
        }
        let effect = parsed
            .arg(2)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "effect give needs an effect"))?;
        if !is_canonical_id(effect) {
            return Err(CommandIssue::invalid_argument(
                command,
                format!("effect id '{}' is not namespace:id", effect),
            ));
        }

        if let Some(seconds) = parsed.arg(3) {
            let seconds: u32 = seconds.parse().map_err(|_| {
                CommandIssue::effect_out_of_bounds(command, format!("duration '{}'", seconds))
            })?;
            if seconds > self.config.max_effect_seconds {
                return Err(CommandIssue::effect_out_of_bounds(
                    command,
                    format!("{}s exceeds {}s", seconds, self.config.max_effect_seconds),
                ));
            }
        }
        if let Some(amplifier) = parsed.arg(4) {
            let amplifier: u32 = amplifier.parse().map_err(|_| {
                CommandIssue::effect_out_of_bounds(command, format!("amplifier '{}'", amplifier))
            })?;
            if amplifier > self.config.max_effect_amplifier {
                return Err(CommandIssue::effect_out_of_bounds(
                    command,
                    format!(
                        "amplifier {} exceeds {}",
                        amplifier, self.config.max_effect_amplifier
                    ),
                ));
            }
        }

        let mut facts = CommandFacts::new("effect");
        if let Some(class) = self.catalog.safety_class_of(effect) {
            facts.safety_class = class;
        }
        Ok(facts)
    }

    fn check_tp(&self, parsed: &ParsedCommand<'_>) -> Result<CommandFacts, CommandIssue> {
        let command = parsed.raw;
        let target = parsed
            .arg(0)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "tp needs a target"))?;
        if !SELF_TARGETS.contains(&base_selector(target)) {
            return Err(CommandIssue::target_not_allowed(command, target));
        }
        let position = parsed
            .position(1)
            .ok_or_else(|| CommandIssue::invalid_argument(command, "tp needs <x> <y> <z>"))?;
        let mut facts = CommandFacts::new("tp");
        facts.positions.push(position);
        Ok(facts)
    }

    /// Block ids must be canonical and not forbidden by the catalog.
    fn check_block(&self, command: &str, token: &str) -> Result<SafetyClass, CommandIssue> {
        let block = resource_id(token);
        if !is_canonical_id(block) {
            return Err(CommandIssue::invalid_argument(
                command,
                format!("block id '{}' is not namespace:id", block),
            ));
        }
        match self.catalog.safety_class_of(block) {
            Some(SafetyClass::Forbidden) => Err(CommandIssue::block_forbidden(command, block)),
            Some(class) => Ok(class),
            None => Ok(SafetyClass::Common),
        }
    }
}
