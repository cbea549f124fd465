//! Classifier output and the per-request context that feeds it.

use crate::patch::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether an utterance asks for something to be created, and what with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationIntentDecision {
    pub is_creation: bool,

    /// Clamped score in `[0, 1]`.
    pub confidence: f64,

    /// Names of the signals that fired, in evaluation order.
    pub reasons: Vec<String>,

    pub slots: IntentSlots,
}

impl CreationIntentDecision {
    /// A decision that nothing creative was asked for.
    pub fn not_creation(reason: impl Into<String>) -> Self {
        Self {
            is_creation: false,
            confidence: 0.0,
            reasons: vec![reason.into()],
            slots: IntentSlots::default(),
        }
    }
}

/// Slot values extracted from an utterance.
///
/// Order follows the player's wording; duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentSlots {
    #[serde(default)]
    pub materials: Vec<String>,

    #[serde(default)]
    pub actions: Vec<String>,

    /// Additional slots carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Per-player conversational context handed to the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerContext {
    /// The player's previous chat line, if any.
    #[serde(default)]
    pub previous_message: Option<String>,

    /// BCP-47-ish language hint (`zh`, `en`, ...).
    #[serde(default)]
    pub language_hint: Option<String>,
}

/// Snapshot of the player's surroundings supplied by the API layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    /// Block position of the player.
    #[serde(default)]
    pub position: Option<Coordinates>,

    #[serde(default)]
    pub inventory: Vec<String>,

    #[serde(default)]
    pub level_id: Option<String>,
}
