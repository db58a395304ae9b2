//! Error types for the audit log.

use std::path::PathBuf;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, AuditError>;

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("cannot open audit log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audit log i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit record encoding: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("no free audit log index")]
    Exhausted,

    #[error("audit writer thread has stopped")]
    WriterGone,
}
