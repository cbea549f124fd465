//! # drift-runtime
//!
//! Executes creation plans against the game and wires the pipeline stages
//! into a single request handler.
//!
//! ## Execution model
//!
//! - Templates run in plan order. Only `safe_auto` templates whose
//!   commands pass the whitelist are executed; everything else is skipped
//!   with a reason, so `executed + skipped` always covers the plan.
//! - `dry_run` logs `validated` entries and never talks to the game.
//! - `apply` holds the player's lock for the whole call. A plugin failure
//!   logs `failed` for the template, rolls back the templates applied
//!   earlier in the call (newest first) and aborts the rest.
//! - A transaction log write failure is reported in the result
//!   (`log_trusted = false`) instead of discarding it.
//!
//! ## Usage
//!
//! ```ignore
//! use drift_runtime::{CreationPipeline, SubmitContext, SubmitMode};
//!
//! let pipeline = CreationPipeline::from_config(&config).await?;
//! let response = pipeline
//!     .submit_creation("steve", "我想用紫水晶搭建一盏幽冥莲花灯", SubmitContext::with_mode(SubmitMode::DryRun))
//!     .await?;
//! ```

pub mod error;
pub mod executor;
pub mod locks;
pub mod patch_id;
pub mod pipeline;
pub mod plugin;

pub use error::{PluginError, RuntimeError};
pub use executor::{ExecutionOptions, PatchExecutor};
pub use locks::{CancelFlag, PlayerLocks};
pub use patch_id::derive_patch_id;
pub use pipeline::{CreationPipeline, CreationResponse, SubmitContext, SubmitMode};
pub use plugin::{NullPlugin, OutboxPlugin, PluginAck, WorldPlugin};
