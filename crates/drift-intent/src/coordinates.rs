//! Explicit coordinate extraction from chat.
//!
//! Only integer triples are extracted. Tilde-relative positions typed in chat
//! are ignored; relative placement is the planner's default anyway.

use drift_core::Coordinates;
use regex::Regex;
use std::sync::LazyLock;

static TRIPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\d~.\-])(-?\d{1,8})(?:\s*[,，]\s*|\s+)(-?\d{1,8})(?:\s*[,，]\s*|\s+)(-?\d{1,8})(?:$|[^\d.])")
        .expect("coordinate pattern is valid")
});

/// First `x y z` triple in `message`, if any.
///
/// Separators may be whitespace or commas (ASCII or full-width).
pub fn extract_coordinates(message: &str) -> Option<Coordinates> {
    let caps = TRIPLE.captures(message)?;
    let x = caps.get(1)?.as_str().parse().ok()?;
    let y = caps.get(2)?.as_str().parse().ok()?;
    let z = caps.get(3)?.as_str().parse().ok()?;
    Some(Coordinates::new(x, y, z))
}
