//! # drift-core
//!
//! Shared types for the DriftSystem creation-intent pipeline.
//!
//! A player utterance travels through four stages, each owned by its own
//! crate, and every stage speaks the types defined here:
//!
//! ```text
//! utterance ──► CreationIntentDecision ──► CreationPlan ──► ExecutionResult
//!               (drift-intent)             (drift-planner,   (drift-runtime,
//!                                           drift-policy)     drift-txlog)
//! ```
//!
//! The [`WorldPatch`] envelope is the unit of mutation sent to the
//! Minecraft plugin; [`TransactionEntry`] is its durable record.

pub mod config;
pub mod execution;
pub mod intent;
pub mod patch;
pub mod plan;
pub mod resource;
pub mod transaction;

pub use config::{
    CatalogConfig, ConfigError, DriftConfig, ExecutorConfig, IntentConfig, LoggingConfig,
    PolicyConfig, TransactionLogConfig,
};
pub use execution::{ErrorKind, ExecutedEntry, ExecutionIssue, ExecutionResult, SkippedEntry};
pub use intent::{CreationIntentDecision, IntentSlots, PlayerContext, WorldState};
pub use patch::{
    CoordinateSource, Coordinates, ExecutionTier, ExecutionValidation, McPayload, PatchMetadata,
    PatchTemplate, WorldDamageRisk, WorldPatch,
};
pub use plan::{CreationPlan, PlanStep, StepStatus, StepType};
pub use resource::{is_canonical_id, MaterialResolution, ResolutionStatus, ResourceCategory, SafetyClass};
pub use transaction::{IRREVERSIBLE_KEY, TransactionEntry, TransactionStatus};
