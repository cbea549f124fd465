//! Minecraft command tokenizer.

use drift_core::Coordinates;
use std::fmt;

/// One axis of a command position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordToken {
    Absolute(i64),
    /// `~` or `~n`, relative to the executing player.
    Relative(i64),
}

impl CoordToken {
    /// Integers and `~`-relative offsets. Local `^` and decimals are rejected.
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(offset) = token.strip_prefix('~') {
            if offset.is_empty() {
                return Some(Self::Relative(0));
            }
            return offset.parse().ok().map(Self::Relative);
        }
        token.parse().ok().map(Self::Absolute)
    }

    /// Distance from the player along this axis, when it can be known.
    pub fn offset_from(&self, player_axis: Option<i64>) -> Option<u64> {
        match (self, player_axis) {
            (Self::Relative(n), _) => Some(n.unsigned_abs()),
            (Self::Absolute(v), Some(p)) => Some(v.abs_diff(p)),
            (Self::Absolute(_), None) => None,
        }
    }

    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }
}

impl fmt::Display for CoordToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute(v) => write!(f, "{}", v),
            Self::Relative(0) => f.write_str("~"),
            Self::Relative(n) => write!(f, "~{}", n),
        }
    }
}

/// A command split into opcode and whitespace-separated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub raw: &'a str,
    /// Lowercased, without a leading `/`.
    pub opcode: String,
    pub args: Vec<&'a str>,
}

impl<'a> ParsedCommand<'a> {
    /// Returns `None` for a blank command.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let trimmed = raw.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        let mut tokens = body.split_whitespace();
        let opcode = tokens.next()?.to_lowercase();
        Some(Self {
            raw,
            opcode,
            args: tokens.collect(),
        })
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).copied()
    }

    /// Three consecutive coordinate tokens starting at `index`.
    pub fn position(&self, index: usize) -> Option<[CoordToken; 3]> {
        let x = CoordToken::parse(self.arg(index)?)?;
        let y = CoordToken::parse(self.arg(index + 1)?)?;
        let z = CoordToken::parse(self.arg(index + 2)?)?;
        Some([x, y, z])
    }
}

/// Resource id with any block state or NBT suffix removed.
pub fn resource_id(token: &str) -> &str {
    let end = token.find(['[', '{']).unwrap_or(token.len());
    &token[..end]
}

/// Selector without its `[...]` arguments.
pub fn base_selector(token: &str) -> &str {
    let end = token.find('[').unwrap_or(token.len());
    &token[..end]
}

/// Whether every axis of `position` lies within `radius` of the player.
///
/// Absolute axes are only bounded when the player position is known.
pub fn within_radius(
    position: &[CoordToken; 3],
    player: Option<&Coordinates>,
    radius: i64,
) -> bool {
    let radius = radius.max(0).unsigned_abs();
    let axes = [
        player.map(|p| p.x),
        player.map(|p| p.y),
        player.map(|p| p.z),
    ];
    position
        .iter()
        .zip(axes)
        .all(|(token, axis)| token.offset_from(axis).is_some_and(|d| d <= radius))
}
