//! World-damage risk from affected volume.

use crate::command::CoordToken;
use drift_core::{PolicyConfig, WorldDamageRisk};

/// Number of blocks a command may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffectedVolume {
    Blocks(u64),
    /// Corners mix absolute and relative axes, so the size is unknown.
    Unknown,
}

impl AffectedVolume {
    /// Volume of the box spanned by two corners, inclusive.
    pub fn between(from: &[CoordToken; 3], to: &[CoordToken; 3]) -> Self {
        let mut volume: u64 = 1;
        for (a, b) in from.iter().zip(to) {
            let span = match (a, b) {
                (CoordToken::Absolute(a), CoordToken::Absolute(b))
                | (CoordToken::Relative(a), CoordToken::Relative(b)) => {
                    a.abs_diff(*b).saturating_add(1)
                }
                _ => return Self::Unknown,
            };
            volume = volume.saturating_mul(span);
        }
        Self::Blocks(volume)
    }
}

pub fn risk_for_volume(volume: AffectedVolume, config: &PolicyConfig) -> WorldDamageRisk {
    match volume {
        AffectedVolume::Blocks(0) => WorldDamageRisk::None,
        AffectedVolume::Blocks(n) if n <= config.low_risk_volume => WorldDamageRisk::Low,
        AffectedVolume::Blocks(n) if n <= config.medium_risk_volume => WorldDamageRisk::Medium,
        _ => WorldDamageRisk::High,
    }
}
