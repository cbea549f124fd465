//! Transaction log configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLogConfig {
    /// Directory holding one JSON-lines file per UTC day.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// Whether each append is followed by `fsync`.
    #[serde(default = "default_fsync")]
    pub fsync: bool,
}

impl Default for TransactionLogConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            fsync: default_fsync(),
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from("data/transactions")
}

fn default_fsync() -> bool {
    true
}
