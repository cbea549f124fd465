//! Error types for the transaction log.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxLogError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An `applied` entry without an undo patch must be marked irreversible.
    #[error("applied entry {patch_id}/{step_id} has no undo patch and is not marked irreversible")]
    MissingUndo { patch_id: String, step_id: String },

    /// Backend-specific failure.
    #[error("storage error: {0}")]
    Storage(String),
}
