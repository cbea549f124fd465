//! Error types for the runtime crate.

use drift_catalog::CatalogError;
use drift_core::ErrorKind;
use drift_intent::IntentError;
use drift_txlog::TxLogError;
use thiserror::Error;

/// Failures that stop a request before a result can be produced.
///
/// Execution problems (plugin failures, rejected commands, log write
/// failures) do not surface here; they are reported inside the
/// `ExecutionResult`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Malformed message or context. Nothing was persisted.
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("transaction log error: {0}")]
    TxLog(#[from] TxLogError),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),
}

impl RuntimeError {
    /// The pipeline error kind, where one applies.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::BadInput(_) => Some(ErrorKind::BadInput),
            Self::TxLog(_) => Some(ErrorKind::LogWriteFailure),
            Self::Plugin(_) => Some(ErrorKind::PluginFailure),
            Self::Catalog(_) => None,
        }
    }
}

impl From<IntentError> for RuntimeError {
    fn from(err: IntentError) -> Self {
        match err {
            IntentError::BadInput(message) => Self::BadInput(message),
        }
    }
}

/// Errors talking to the game plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("plugin unavailable: {0}")]
    Unavailable(String),
}
