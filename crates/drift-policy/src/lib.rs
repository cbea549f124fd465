//! # drift-policy
//!
//! Decides whether a patch template may run unattended.
//!
//! Every command in a template is parsed and checked against a fixed
//! whitelist (`setblock`, `fill`, `summon`, `effect give`, `tp`, `tellraw`,
//! `title`). The [`PatchValidator`] then assigns a tier:
//!
//! 1. Any rejected command: `blocked`.
//! 2. Sensitive material, explicit confirmation or low confidence:
//!    `needs_confirm`.
//! 3. Every command whitelisted, every position inside the player radius and
//!    an undo patch present: `safe_auto`.
//! 4. Anything else: `needs_confirm`.
//!
//! Large `fill` volumes raise the world-damage risk and cap the tier at
//! `needs_confirm`.

pub mod command;
pub mod error;
pub mod risk;
pub mod validator;

pub use command::{CoordToken, ParsedCommand};
pub use error::{CommandIssue, CommandIssueKind};
pub use risk::{AffectedVolume, risk_for_volume};
pub use validator::{CommandFacts, PatchValidator, ValidationContext};
