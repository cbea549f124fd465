//! # drift-planner
//!
//! Builds a [`CreationPlan`](drift_core::CreationPlan) from a creation
//! decision: resolves materials, synthesizes one step and one patch template
//! per material, pairs every template with an undo patch where one can be
//! derived, and runs each template through the patch validator.

pub mod templates;
pub mod transformer;

pub use transformer::PlanTransformer;
