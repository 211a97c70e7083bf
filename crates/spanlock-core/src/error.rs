//! The shared access-error taxonomy.
//!
//! Every asynchronous entry point in the engines reports through
//! [`AccessError`]; errors never cross the event loop as panics. Layer errors
//! (`ProtocolError`, `CryptoError`, `StoreError`) fold into this taxonomy at
//! the engine boundary via the `From` impls below.

use spanlock_crypto::CryptoError;
use spanlock_proto::{Name, ProtocolError};
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by the produce and consume pipelines.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// An interest expired without a response and the retry budget is spent.
    #[error("interest timed out")]
    Timeout,

    /// The validator rejected a fetched data object.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The wire algorithm id is known but not decryptable here.
    #[error("unsupported encryption scheme: algorithm id {0}")]
    UnsupportedEncryptionScheme(u8),

    /// A fetched object's content does not parse as the expected structure.
    #[error("invalid encrypted format: {0}")]
    InvalidEncryptedFormat(String),

    /// The consumer key named by a D-KEY object is not in the database.
    #[error("no decryption key for {0}")]
    NoDecryptKey(Name),

    /// An encryption primitive failed while wrapping key material.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// A fetch ran out of retries and delegations.
    #[error("data retrieval failed for {0}")]
    DataRetrievalFailure(Name),

    /// Anything that does not fit the categories above.
    #[error("{0}")]
    General(String),
}

impl From<ProtocolError> for AccessError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnknownAlgorithm(id) => {
                // Known-to-be-unknown ids are a scheme problem, not a framing
                // problem; ids above u8 range cannot collide with real ones.
                Self::UnsupportedEncryptionScheme(id.min(u64::from(u8::MAX)) as u8)
            }
            other => Self::InvalidEncryptedFormat(other.to_string()),
        }
    }
}

impl From<CryptoError> for AccessError {
    fn from(err: CryptoError) -> Self {
        Self::EncryptionFailure(err.to_string())
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        Self::General(format!("key store: {err}"))
    }
}
