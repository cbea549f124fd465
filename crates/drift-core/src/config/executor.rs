//! Patch executor configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// A plugin call without acknowledgement after this long counts as failed.
    #[serde(default = "default_plugin_timeout_ms")]
    pub plugin_timeout_ms: u64,

    /// JSON-lines file the outbox plugin adapter appends world patches to.
    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
}

impl ExecutorConfig {
    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_millis(self.plugin_timeout_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            plugin_timeout_ms: default_plugin_timeout_ms(),
            outbox_path: default_outbox_path(),
        }
    }
}

fn default_plugin_timeout_ms() -> u64 {
    5000
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("data/outbox/world_patches.jsonl")
}
