//! Durable records of attempted and committed templates.

use crate::patch::WorldPatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata key marking an applied entry that has no undo patch.
pub const IRREVERSIBLE_KEY: &str = "irreversible";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Validated,
    Applied,
    RolledBack,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Applied => "applied",
            Self::RolledBack => "rolled_back",
            Self::Failed => "failed",
        }
    }

    /// Whether an entry with this status says something about the world.
    /// `validated` only records a dry run.
    pub fn changes_world(&self) -> bool {
        !matches!(self, Self::Validated)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record in the append-only transaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub patch_id: String,

    /// Position within the patch's sequence; assigned by the log on append.
    #[serde(default)]
    pub seq: u64,

    pub template_id: String,
    pub step_id: String,
    pub commands: Vec<String>,
    pub undo_patch: Option<WorldPatch>,
    pub status: TransactionStatus,

    #[serde(default)]
    pub metadata: Map<String, Value>,

    /// UTC timestamp (RFC3339).
    pub ts: DateTime<Utc>,

    /// Fields written by newer versions, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransactionEntry {
    pub fn new(
        patch_id: impl Into<String>,
        template_id: impl Into<String>,
        step_id: impl Into<String>,
        commands: Vec<String>,
        status: TransactionStatus,
    ) -> Self {
        Self {
            patch_id: patch_id.into(),
            seq: 0,
            template_id: template_id.into(),
            step_id: step_id.into(),
            commands,
            undo_patch: None,
            status,
            metadata: Map::new(),
            ts: Utc::now(),
            extra: Map::new(),
        }
    }

    pub fn with_undo(mut self, undo: Option<WorldPatch>) -> Self {
        self.undo_patch = undo;
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn is_irreversible(&self) -> bool {
        self.metadata
            .get(IRREVERSIBLE_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn has_undo(&self) -> bool {
        self.undo_patch.as_ref().is_some_and(|undo| !undo.is_empty())
    }

    /// Key on which recording is idempotent.
    pub fn idempotency_key(&self) -> (String, String, TransactionStatus) {
        (self.patch_id.clone(), self.step_id.clone(), self.status)
    }
}
