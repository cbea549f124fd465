//! Results reported by the patch executor.

use crate::transaction::{TransactionEntry, TransactionStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds surfaced to callers of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadInput,
    ResourceUnresolved,
    CommandRejected,
    TierBlocked,
    PluginFailure,
    LogWriteFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadInput => "bad_input",
            Self::ResourceUnresolved => "resource_unresolved",
            Self::CommandRejected => "command_rejected",
            Self::TierBlocked => "tier_blocked",
            Self::PluginFailure => "plugin_failure",
            Self::LogWriteFailure => "log_write_failure",
        };
        f.write_str(s)
    }
}

/// A problem encountered while executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionIssue {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub message: String,
}

impl ExecutionIssue {
    pub fn new(kind: ErrorKind, template_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            template_id: template_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// A template that went through dry-run or apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedEntry {
    pub template_id: String,
    pub step_id: String,
    pub commands: Vec<String>,
    /// Final status after any compensation.
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub template_id: String,
    pub reason: String,
}

/// Outcome of a dry-run or apply.
///
/// Every template of the plan ends up either in `executed` or in `skipped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub patch_id: String,
    pub executed: Vec<ExecutedEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub warnings: Vec<String>,
    pub transactions: Vec<TransactionEntry>,
    #[serde(default)]
    pub issues: Vec<ExecutionIssue>,
    /// False when a log write failed and the persisted record is incomplete.
    pub log_trusted: bool,
}

impl ExecutionResult {
    pub fn new(patch_id: impl Into<String>) -> Self {
        Self {
            patch_id: patch_id.into(),
            executed: Vec::new(),
            skipped: Vec::new(),
            warnings: Vec::new(),
            transactions: Vec::new(),
            issues: Vec::new(),
            log_trusted: true,
        }
    }

    pub fn skip(&mut self, template_id: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedEntry {
            template_id: template_id.into(),
            reason: reason.into(),
        });
    }

    pub fn has_issue(&self, kind: ErrorKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}
