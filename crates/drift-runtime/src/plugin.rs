//! Adapters that deliver world patches to the Minecraft plugin.

use crate::error::PluginError;
use async_trait::async_trait;
use drift_core::WorldPatch;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// The plugin's answer to one world patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginAck {
    pub applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginAck {
    pub fn applied() -> Self {
        Self {
            applied: true,
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            applied: false,
            error: Some(error.into()),
        }
    }
}

/// Downstream collaborator that runs world patches in the game.
#[async_trait]
pub trait WorldPlugin: Send + Sync {
    async fn apply_patch(&self, patch: &WorldPatch) -> Result<PluginAck, PluginError>;
}

/// Appends each patch as a JSON line to an outbox file that the game-side
/// plugin tails.
pub struct OutboxPlugin {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl OutboxPlugin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl WorldPlugin for OutboxPlugin {
    async fn apply_patch(&self, patch: &WorldPatch) -> Result<PluginAck, PluginError> {
        let mut line = serde_json::to_string(patch)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            outbox = %self.path.display(),
            template_id = %patch.metadata.template_id,
            commands = patch.mc.commands.len(),
            "World patch written to outbox"
        );
        Ok(PluginAck::applied())
    }
}

/// Acknowledges everything without touching the world.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlugin;

#[async_trait]
impl WorldPlugin for NullPlugin {
    async fn apply_patch(&self, _patch: &WorldPatch) -> Result<PluginAck, PluginError> {
        Ok(PluginAck::applied())
    }
}
