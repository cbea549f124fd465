//! Reasons a command is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single rejected command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandIssue {
    pub kind: CommandIssueKind,
    /// The command text as received.
    pub command: String,
    /// Human-readable explanation.
    pub message: String,
}

impl CommandIssue {
    pub fn new(
        kind: CommandIssueKind,
        command: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn not_whitelisted(command: &str, opcode: &str) -> Self {
        Self::new(
            CommandIssueKind::CommandNotWhitelisted,
            command,
            format!("Opcode '{}' is not on the command whitelist", opcode),
        )
    }

    pub fn forbidden(command: &str, word: &str) -> Self {
        Self::new(
            CommandIssueKind::CommandForbidden,
            command,
            format!("Command references forbidden operation '{}'", word),
        )
    }

    pub fn invalid_argument(command: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            CommandIssueKind::InvalidArgument,
            command,
            format!("Invalid argument: {}", detail),
        )
    }

    pub fn entity_forbidden(command: &str, entity: &str) -> Self {
        Self::new(
            CommandIssueKind::EntityForbidden,
            command,
            format!("Entity '{}' may not be summoned", entity),
        )
    }

    pub fn block_forbidden(command: &str, block: &str) -> Self {
        Self::new(
            CommandIssueKind::BlockForbidden,
            command,
            format!("Block '{}' may not be placed", block),
        )
    }

    pub fn target_not_allowed(command: &str, target: &str) -> Self {
        Self::new(
            CommandIssueKind::TargetNotAllowed,
            command,
            format!("Target '{}' is not allowed, use @s or @p", target),
        )
    }

    pub fn effect_out_of_bounds(command: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            CommandIssueKind::EffectOutOfBounds,
            command,
            format!("Effect out of bounds: {}", detail),
        )
    }

    pub fn undo_not_whitelisted(command: &str) -> Self {
        Self::new(
            CommandIssueKind::UndoNotWhitelisted,
            command,
            "Undo commands are limited to setblock, fill, tagged kill and effect clear",
        )
    }
}

impl fmt::Display for CommandIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.kind, self.message, self.command)
    }
}

impl std::error::Error for CommandIssue {}

/// Categories of command rejection.
///
/// The serialized names are the stable codes written into
/// `ExecutionValidation.errors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandIssueKind {
    /// Opcode is not on the whitelist.
    CommandNotWhitelisted,
    /// Command references a server-administration operation.
    CommandForbidden,
    /// Coordinates, ids or modes are malformed.
    InvalidArgument,
    /// `summon` of a forbidden or out-of-namespace entity.
    EntityForbidden,
    /// Placement of a block the catalog marks forbidden.
    BlockForbidden,
    /// Selector other than `@s`/`@p` where one is required.
    TargetNotAllowed,
    /// `effect give` duration or amplifier beyond the configured bounds.
    EffectOutOfBounds,
    /// Undo command outside the undo whitelist.
    UndoNotWhitelisted,
}

impl CommandIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommandNotWhitelisted => "command_not_whitelisted",
            Self::CommandForbidden => "command_forbidden",
            Self::InvalidArgument => "invalid_argument",
            Self::EntityForbidden => "entity_forbidden",
            Self::BlockForbidden => "block_forbidden",
            Self::TargetNotAllowed => "target_not_allowed",
            Self::EffectOutOfBounds => "effect_out_of_bounds",
            Self::UndoNotWhitelisted => "undo_not_whitelisted",
        }
    }
}

impl fmt::Display for CommandIssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
