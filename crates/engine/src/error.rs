use std::path::PathBuf;
use thiserror::Error;

/// Error hierarchy for the store. Crosses the public API boundary wrapped in
/// `anyhow::Error`, but callers that need to match on a specific failure mode
/// can still downcast to this type.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt sstable at {path}: {reason}")]
    CorruptSst { path: PathBuf, reason: String },

    #[error("store is shutting down")]
    ShuttingDown,

    #[error("key or value must not be empty")]
    ArgNull,

    #[error("key exceeds maximum size")]
    KeyTooLarge,

    #[error("value exceeds maximum size")]
    ValueTooLarge,

    #[error("recovery applied {records_applied} wal record(s) before hitting an unreadable tail")]
    RecoveryPartial { records_applied: usize },
}
