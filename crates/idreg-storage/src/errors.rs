//! Storage error types.

use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB rejected a read or write
    #[error("RocksDB error: {0}")]
    Database(#[from] rocksdb::Error),

    /// A key or value could not be bincode-encoded
    #[error("Failed to encode: {0}")]
    Encode(#[source] bincode::Error),

    /// A stored row no longer matches the type it is read as
    #[error("Failed to decode stored row: {0}")]
    Decode(#[source] bincode::Error),

    /// A batch precondition no longer holds at commit time
    #[error("Write conflict in {cf}")]
    Conflict { cf: String },

    /// The database was opened without this column family
    #[error("Unknown column family: {0}")]
    UnknownColumnFamily(String),

    /// A committer panicked while holding the commit lock
    #[error("Commit lock poisoned")]
    CommitLockPoisoned,

    /// Temporary directory setup failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the operation lost a race and may be retried against fresh state
    pub fn is_conflict(&self) -> bool {
        matches!(self, StorageError::Conflict { .. })
    }
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
