//! Error types for the intent crate.

use thiserror::Error;

/// The classifier only fails on input it cannot interpret at all; anything
/// else becomes a non-creation decision.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("bad input: {0}")]
    BadInput(String),
}
