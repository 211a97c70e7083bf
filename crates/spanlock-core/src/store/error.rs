//! Key-database error type.

use thiserror::Error;

/// Errors from a [`KeyStore`](super::KeyStore) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying storage I/O failed.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// A stored record failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored record decoded but violates a key-material invariant.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}
