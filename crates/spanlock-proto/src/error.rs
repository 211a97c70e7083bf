//! Wire-level error types.
//!
//! Strongly-typed errors for the TLV codec and the name/timestamp grammar.
//! Engines map all of these into the shared access-error taxonomy at their
//! boundary; inside this crate the variants stay precise so tests can assert
//! on the exact failure.

use thiserror::Error;

/// Errors produced while parsing or emitting wire structures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// TLV input ended before the declared element length.
    #[error("truncated TLV: needed {needed} more bytes")]
    Truncated {
        /// How many bytes were missing.
        needed: usize,
    },

    /// A TLV element carried an unexpected type number.
    #[error("unexpected TLV type {got:#x}, expected {expected:#x}")]
    UnexpectedType {
        /// Type number required at this position.
        expected: u64,
        /// Type number actually read.
        got: u64,
    },

    /// A TLV number used a longer encoding than necessary.
    ///
    /// Minimal form is required on decode so that every structure has exactly
    /// one byte representation.
    #[error("non-minimal TLV number encoding")]
    NonMinimalNumber,

    /// Bytes remained after the outermost element was consumed.
    #[error("{count} trailing bytes after TLV element")]
    TrailingBytes {
        /// Number of unconsumed bytes.
        count: usize,
    },

    /// The algorithm id is not one the codec knows.
    #[error("unknown encryption algorithm id {0}")]
    UnknownAlgorithm(u64),

    /// The structure decoded but violates the EncryptedContent grammar.
    #[error("invalid encrypted content: {0}")]
    InvalidEncryptedFormat(String),

    /// A name component did not parse as an ISO-8601 basic timestamp.
    #[error("invalid timestamp component: {0}")]
    InvalidTimestamp(String),

    /// A name URI contained an escape the parser cannot decode.
    #[error("invalid name URI: {0}")]
    InvalidUri(String),
}
