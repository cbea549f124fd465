//! Patch validation policy.

use serde::{Deserialize, Serialize};

/// Bounds applied by the patch validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Maximum per-axis distance from the player for unattended placement.
    #[serde(default = "default_player_radius")]
    pub player_radius: i64,

    /// Plans below this confidence always need confirmation.
    #[serde(default = "default_confirm_confidence")]
    pub confirm_confidence: f64,

    /// Namespaces `summon` may draw entities from.
    #[serde(default = "default_entity_namespaces")]
    pub allowed_entity_namespaces: Vec<String>,

    /// Upper bound for `effect give` duration in seconds.
    #[serde(default = "default_max_effect_seconds")]
    pub max_effect_seconds: u32,

    /// Upper bound for `effect give` amplifier.
    #[serde(default = "default_max_effect_amplifier")]
    pub max_effect_amplifier: u32,

    /// Affected volumes up to this many blocks are `low` risk.
    #[serde(default = "default_low_risk_volume")]
    pub low_risk_volume: u64,

    /// Affected volumes up to this many blocks are `medium` risk; above is `high`.
    #[serde(default = "default_medium_risk_volume")]
    pub medium_risk_volume: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            player_radius: default_player_radius(),
            confirm_confidence: default_confirm_confidence(),
            allowed_entity_namespaces: default_entity_namespaces(),
            max_effect_seconds: default_max_effect_seconds(),
            max_effect_amplifier: default_max_effect_amplifier(),
            low_risk_volume: default_low_risk_volume(),
            medium_risk_volume: default_medium_risk_volume(),
        }
    }
}

fn default_player_radius() -> i64 {
    32
}

fn default_confirm_confidence() -> f64 {
    0.6
}

fn default_entity_namespaces() -> Vec<String> {
    vec!["minecraft".to_string()]
}

fn default_max_effect_seconds() -> u32 {
    300
}

fn default_max_effect_amplifier() -> u32 {
    4
}

fn default_low_risk_volume() -> u64 {
    64
}

fn default_medium_risk_volume() -> u64 {
    1024
}
