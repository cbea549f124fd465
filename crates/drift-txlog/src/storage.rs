//! Transaction storage backends.

use crate::error::TxLogError;
use async_trait::async_trait;
use drift_core::{TransactionEntry, TransactionLogConfig};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const FILE_PREFIX: &str = "transactions-";
const FILE_SUFFIX: &str = ".jsonl";

/// Trait for transaction storage backends.
#[async_trait]
pub trait TransactionStorage: Send + Sync {
    /// Durably append one entry.
    async fn append(&self, entry: &TransactionEntry) -> Result<(), TxLogError>;

    /// Every stored entry, in append order.
    async fn load_all(&self) -> Result<Vec<TransactionEntry>, TxLogError>;
}

/// JSON Lines files, one per UTC day.
pub struct FileStorage {
    directory: PathBuf,
    fsync: bool,
    // Serializes appends from this process so lines never interleave.
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStorage {
    /// Create a file storage rooted at `directory`. The directory is created
    /// on first append.
    pub fn new(directory: impl Into<PathBuf>, fsync: bool) -> Self {
        Self {
            directory: directory.into(),
            fsync,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_config(config: &TransactionLogConfig) -> Self {
        Self::new(config.directory.clone(), config.fsync)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the day file an entry belongs to.
    pub fn file_for(&self, entry: &TransactionEntry) -> PathBuf {
        self.directory.join(format!(
            "{}{}{}",
            FILE_PREFIX,
            entry.ts.format("%Y-%m-%d"),
            FILE_SUFFIX
        ))
    }

    /// Day files in chronological order.
    async fn day_files(&self) -> Result<Vec<PathBuf>, TxLogError> {
        let mut dir = match tokio::fs::read_dir(&self.directory).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let name = item.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                files.push(item.path());
            }
        }
        // ISO dates sort lexicographically.
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl TransactionStorage for FileStorage {
    async fn append(&self, entry: &TransactionEntry) -> Result<(), TxLogError> {
        let record = serde_json::to_string(entry)?;

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.directory).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(self.file_for(entry))
            .await?;

        // Terminate a torn tail first so it cannot swallow this record.
        let mut line = String::with_capacity(record.len() + 2);
        if ends_with_fragment(&mut file).await? {
            tracing::warn!(
                file = %self.file_for(entry).display(),
                "Terminating torn transaction record before append"
            );
            line.push('\n');
        }
        line.push_str(&record);
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        if self.fsync {
            file.sync_data().await?;
        } else {
            file.flush().await?;
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<TransactionEntry>, TxLogError> {
        let mut entries = Vec::new();
        for path in self.day_files().await? {
            let content = tokio::fs::read_to_string(&path).await?;
            entries.extend(parse_lines(&path, &content));
        }
        Ok(entries)
    }
}

/// Whether a non-empty file lacks its final `\n`.
async fn ends_with_fragment(file: &mut tokio::fs::File) -> std::io::Result<bool> {
    if file.metadata().await?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1)).await?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last).await?;
    Ok(last[0] != b'\n')
}

/// Parse complete lines; a trailing fragment without `\n` is an in-flight
/// write and is skipped.
fn parse_lines(path: &Path, content: &str) -> Vec<TransactionEntry> {
    let complete = match content.rfind('\n') {
        Some(end) => &content[..end],
        None => "",
    };

    complete
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(n, line)| match serde_json::from_str(line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(
                    file = %path.display(),
                    line = n + 1,
                    error = %e,
                    "Skipping unreadable transaction record"
                );
                None
            }
        })
        .collect()
}

/// In-process storage.
#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<Vec<TransactionEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStorage for MemoryStorage {
    async fn append(&self, entry: &TransactionEntry) -> Result<(), TxLogError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| TxLogError::Storage(format!("Failed to acquire write lock: {}", e)))?;
        entries.push(entry.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<TransactionEntry>, TxLogError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| TxLogError::Storage(format!("Failed to acquire read lock: {}", e)))?;
        Ok(entries.clone())
    }
}
