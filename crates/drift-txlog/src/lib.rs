//! # drift-txlog
//!
//! Append-only log of [`TransactionEntry`](drift_core::TransactionEntry)
//! records.
//!
//! ## Contract
//!
//! - `record` is atomic for readers: an entry is either fully visible or
//!   not at all.
//! - `load` yields entries in insertion order.
//! - `record` is idempotent: writing an entry whose `(patch_id, step_id,
//!   status)` matches the latest entry for that step is a no-op.
//! - An `applied` entry must carry an undo patch or be marked
//!   `irreversible` in its metadata.
//!
//! ## Storage
//!
//! [`FileStorage`] writes JSON Lines, one file per UTC day
//! (`transactions-YYYY-MM-DD.jsonl`). Each entry is a single `write` of the
//! serialized line plus its newline; readers ignore a trailing line without
//! a newline, so a torn write is never surfaced. [`MemoryStorage`] keeps
//! entries in process for tests and dry runs.

pub mod error;
pub mod log;
pub mod storage;

pub use error::TxLogError;
pub use log::{RecordOutcome, TransactionFilter, TransactionLog};
pub use storage::{FileStorage, MemoryStorage, TransactionStorage};
