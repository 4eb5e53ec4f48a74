//! Error types for the sync engine.
//!
//! Most engine operations absorb these and fall back to a safe default; they
//! surface directly only from the Local Store and the remote adapters.

use thiserror::Error;

/// Failures of the on-device store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode entries: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Failures talking to the remote prayer table.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("device is offline")]
    Offline,

    #[error("remote store unavailable: {0}")]
    Unavailable(String),

    #[error("remote query failed: {0}")]
    Query(String),

    #[error("remote sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("no async runtime available to run the sync timer")]
    NoRuntime,
}
