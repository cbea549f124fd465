//! The transaction log front end.

use crate::error::TxLogError;
use crate::storage::{FileStorage, MemoryStorage, TransactionStorage};
use drift_core::{TransactionEntry, TransactionLogConfig, TransactionStatus};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Result of [`TransactionLog::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Entry appended with this sequence number.
    Appended(u64),
    /// Nothing written: the step's latest world-changing entry already has
    /// this status, or the step was already validated.
    Duplicate,
}

/// Filter for querying the log.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub patch_id: Option<String>,
    pub step_id: Option<String>,
    pub status: Option<TransactionStatus>,
    /// Keep only the last `limit` matches.
    pub limit: Option<usize>,
}

impl TransactionFilter {
    pub fn for_patch(patch_id: impl Into<String>) -> Self {
        Self {
            patch_id: Some(patch_id.into()),
            ..Default::default()
        }
    }

    fn matches(&self, entry: &TransactionEntry) -> bool {
        self.patch_id.as_ref().is_none_or(|p| &entry.patch_id == p)
            && self.step_id.as_ref().is_none_or(|s| &entry.step_id == s)
            && self.status.is_none_or(|s| entry.status == s)
    }
}

/// Committed view of the log.
#[derive(Default)]
struct LogState {
    entries: Vec<TransactionEntry>,
    /// Latest world-changing status per (patch_id, step_id).
    latest: HashMap<(String, String), TransactionStatus>,
    validated: HashSet<(String, String)>,
    next_seq: HashMap<String, u64>,
}

impl LogState {
    fn rebuild(entries: Vec<TransactionEntry>) -> Self {
        let mut state = Self::default();
        for entry in entries {
            state.commit(entry);
        }
        state
    }

    fn commit(&mut self, entry: TransactionEntry) {
        let next = self.next_seq.entry(entry.patch_id.clone()).or_insert(1);
        *next = (*next).max(entry.seq + 1);
        let key = (entry.patch_id.clone(), entry.step_id.clone());
        if entry.status.changes_world() {
            self.latest.insert(key, entry.status);
        } else {
            self.validated.insert(key);
        }
        self.entries.push(entry);
    }

    fn is_duplicate(&self, entry: &TransactionEntry) -> bool {
        let key = (entry.patch_id.clone(), entry.step_id.clone());
        if entry.status.changes_world() {
            self.latest.get(&key) == Some(&entry.status)
        } else {
            self.validated.contains(&key)
        }
    }
}

/// Append-only transaction log.
///
/// Writes for one `patch_id` are serialized; writes for different patches
/// proceed independently. Readers see an in-memory snapshot that is only
/// extended after the storage append succeeded.
pub struct TransactionLog {
    storage: Arc<dyn TransactionStorage>,
    state: RwLock<LogState>,
    patch_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl TransactionLog {
    /// Open a log over `storage`, replaying what it already holds.
    pub async fn open(storage: Arc<dyn TransactionStorage>) -> Result<Self, TxLogError> {
        let entries = storage.load_all().await?;
        tracing::debug!(entries = entries.len(), "Transaction log opened");
        Ok(Self {
            storage,
            state: RwLock::new(LogState::rebuild(entries)),
            patch_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Open the file-backed log described by `config`.
    pub async fn from_config(config: &TransactionLogConfig) -> Result<Self, TxLogError> {
        Self::open(Arc::new(FileStorage::from_config(config))).await
    }

    /// A log that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            storage: Arc::new(MemoryStorage::new()),
            state: RwLock::new(LogState::default()),
            patch_locks: Mutex::new(HashMap::new()),
        }
    }

    fn patch_lock(&self, patch_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.patch_locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still holds these, so no record is using them.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(patch_id.to_string()).or_default().clone()
    }

    /// Append `entry`, assigning its sequence number.
    pub async fn record(&self, mut entry: TransactionEntry) -> Result<RecordOutcome, TxLogError> {
        if entry.status == TransactionStatus::Applied
            && !entry.has_undo()
            && !entry.is_irreversible()
        {
            return Err(TxLogError::MissingUndo {
                patch_id: entry.patch_id,
                step_id: entry.step_id,
            });
        }

        let lock = self.patch_lock(&entry.patch_id);
        let _guard = lock.lock().await;

        {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            if state.is_duplicate(&entry) {
                tracing::debug!(
                    patch_id = %entry.patch_id,
                    step_id = %entry.step_id,
                    status = %entry.status,
                    "Duplicate transaction entry ignored"
                );
                return Ok(RecordOutcome::Duplicate);
            }
            entry.seq = state.next_seq.get(&entry.patch_id).copied().unwrap_or(1);
        }

        self.storage.append(&entry).await?;

        let seq = entry.seq;
        tracing::debug!(
            patch_id = %entry.patch_id,
            step_id = %entry.step_id,
            status = %entry.status,
            seq,
            "Transaction recorded"
        );
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .commit(entry);
        Ok(RecordOutcome::Appended(seq))
    }

    /// Entries in insertion order, optionally for one patch.
    pub fn load(&self, patch_id: Option<&str>) -> Vec<TransactionEntry> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .entries
            .iter()
            .filter(|e| patch_id.is_none_or(|p| e.patch_id == p))
            .cloned()
            .collect()
    }

    pub fn query(&self, filter: &TransactionFilter) -> Vec<TransactionEntry> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut results: Vec<TransactionEntry> = state
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            let skip = results.len().saturating_sub(limit);
            results.drain(..skip);
        }
        results
    }

    /// Status of the most recent world-changing entry for a step.
    /// `validated` entries never count.
    pub fn latest_status(&self, patch_id: &str, step_id: &str) -> Option<TransactionStatus> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .latest
            .get(&(patch_id.to_string(), step_id.to_string()))
            .copied()
    }

    /// The `applied` entry of every step whose latest world-changing status
    /// is still `applied`, oldest first.
    pub fn still_applied(&self, patch_id: &str) -> Vec<TransactionEntry> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        let mut applied = Vec::new();
        let steps = state
            .entries
            .iter()
            .rev()
            .filter(|e| e.patch_id == patch_id && e.status.changes_world());
        for entry in steps {
            if !seen.insert(entry.step_id.as_str()) {
                continue;
            }
            if entry.status == TransactionStatus::Applied {
                applied.push(entry.clone());
            }
        }
        applied.reverse();
        applied
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{IRREVERSIBLE_KEY, WorldPatch};
    use pretty_assertions::assert_eq;

    fn entry(step: &str, status: TransactionStatus) -> TransactionEntry {
        TransactionEntry::new(
            "build-glass-0a1b2c3d",
            format!("tpl-{}", step),
            step,
            vec!["setblock ~1 ~ ~ minecraft:glass".to_string()],
            status,
        )
        .with_undo(Some(WorldPatch::with_commands(vec![
            "setblock ~1 ~ ~ minecraft:air".to_string(),
        ])))
    }

    #[tokio::test]
    async fn test_record_assigns_sequence() {
        let log = TransactionLog::in_memory();
        assert_eq!(
            log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap(),
            RecordOutcome::Appended(1)
        );
        assert_eq!(
            log.record(entry("step-2", TransactionStatus::Validated)).await.unwrap(),
            RecordOutcome::Appended(2)
        );
        let seqs: Vec<u64> = log.load(None).iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let log = TransactionLog::in_memory();
        log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap();
        let again = log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap();

        assert_eq!(again, RecordOutcome::Duplicate);
        assert_eq!(log.len(), 1);
    }

    #[tokio::test]
    async fn test_status_cycle_is_recorded() {
        let log = TransactionLog::in_memory();
        for status in [
            TransactionStatus::Applied,
            TransactionStatus::RolledBack,
            TransactionStatus::Applied,
        ] {
            let outcome = log.record(entry("step-1", status)).await.unwrap();
            assert!(matches!(outcome, RecordOutcome::Appended(_)));
        }
        assert_eq!(
            log.latest_status("build-glass-0a1b2c3d", "step-1"),
            Some(TransactionStatus::Applied)
        );
    }

    #[tokio::test]
    async fn test_validated_after_apply_keeps_step_applied() {
        let log = TransactionLog::in_memory();
        log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap();
        log.record(entry("step-1", TransactionStatus::Applied)).await.unwrap();
        // A later dry run is already covered by the first validation.
        assert_eq!(
            log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap(),
            RecordOutcome::Duplicate
        );
        assert_eq!(
            log.latest_status("build-glass-0a1b2c3d", "step-1"),
            Some(TransactionStatus::Applied)
        );
        assert_eq!(log.still_applied("build-glass-0a1b2c3d").len(), 1);
        assert_eq!(
            log.record(entry("step-1", TransactionStatus::Applied)).await.unwrap(),
            RecordOutcome::Duplicate
        );
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn test_validated_entry_does_not_hide_applied() {
        let log = TransactionLog::in_memory();
        log.record(entry("step-1", TransactionStatus::Applied)).await.unwrap();
        log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap();

        let steps: Vec<String> = log
            .still_applied("build-glass-0a1b2c3d")
            .into_iter()
            .map(|e| e.step_id)
            .collect();
        assert_eq!(steps, vec!["step-1"]);
        assert_eq!(
            log.latest_status("build-glass-0a1b2c3d", "step-1"),
            Some(TransactionStatus::Applied)
        );
    }

    #[tokio::test]
    async fn test_applied_requires_undo_or_irreversible() {
        let log = TransactionLog::in_memory();
        let bare = entry("step-1", TransactionStatus::Applied).with_undo(None);
        let err = log.record(bare.clone()).await.unwrap_err();
        assert!(matches!(err, TxLogError::MissingUndo { .. }));

        let marked = bare.with_meta(IRREVERSIBLE_KEY, true);
        assert!(log.record(marked).await.is_ok());
    }

    #[tokio::test]
    async fn test_query_filters_and_limit() {
        let log = TransactionLog::in_memory();
        log.record(entry("step-1", TransactionStatus::Applied)).await.unwrap();
        log.record(entry("step-2", TransactionStatus::Failed)).await.unwrap();
        log.record(entry("step-1", TransactionStatus::RolledBack)).await.unwrap();

        let failed = log.query(&TransactionFilter {
            status: Some(TransactionStatus::Failed),
            ..Default::default()
        });
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step_id, "step-2");

        let step_one = log.query(&TransactionFilter {
            step_id: Some("step-1".to_string()),
            ..TransactionFilter::for_patch("build-glass-0a1b2c3d")
        });
        assert_eq!(step_one.len(), 2);

        let last = log.query(&TransactionFilter {
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(last[0].status, TransactionStatus::RolledBack);

        assert!(log.load(Some("other-patch")).is_empty());
    }

    #[tokio::test]
    async fn test_still_applied() {
        let log = TransactionLog::in_memory();
        log.record(entry("step-1", TransactionStatus::Applied)).await.unwrap();
        log.record(entry("step-2", TransactionStatus::Applied)).await.unwrap();
        log.record(entry("step-1", TransactionStatus::RolledBack)).await.unwrap();
        log.record(entry("step-3", TransactionStatus::Applied)).await.unwrap();

        let steps: Vec<String> = log
            .still_applied("build-glass-0a1b2c3d")
            .into_iter()
            .map(|e| e.step_id)
            .collect();
        assert_eq!(steps, vec!["step-2", "step-3"]);
    }

    #[tokio::test]
    async fn test_patch_locks_are_pruned() {
        let log = TransactionLog::in_memory();
        for n in 0..20 {
            let mut e = entry("step-1", TransactionStatus::Validated);
            e.patch_id = format!("patch-{}", n);
            log.record(e).await.unwrap();
        }
        assert_eq!(log.len(), 20);
        assert!(log.patch_locks.lock().unwrap().len() <= 1);
    }

    #[tokio::test]
    async fn test_reopen_replays_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn TransactionStorage> = Arc::new(FileStorage::new(dir.path(), false));

        let log = TransactionLog::open(storage.clone()).await.unwrap();
        log.record(entry("step-1", TransactionStatus::Validated)).await.unwrap();
        drop(log);

        let reopened = TransactionLog::open(storage).await.unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(
            reopened.record(entry("step-1", TransactionStatus::Validated)).await.unwrap(),
            RecordOutcome::Duplicate
        );
        assert_eq!(
            reopened.record(entry("step-2", TransactionStatus::Validated)).await.unwrap(),
            RecordOutcome::Appended(2)
        );
    }
}
