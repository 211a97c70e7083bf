//! Crypto-layer error types.

use thiserror::Error;

/// Errors from the primitive layer.
///
/// Everything here propagates upward; the engines fold these into the shared
/// access-error taxonomy at their boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key length is not one this primitive accepts.
    #[error("invalid key length: expected {expected}, got {got} bytes")]
    InvalidKeyLength {
        /// Accepted lengths, human readable.
        expected: &'static str,
        /// Length supplied.
        got: usize,
    },

    /// Initial vector is not one AES block.
    #[error("invalid IV length: expected 16, got {got} bytes")]
    InvalidIvLength {
        /// Length supplied.
        got: usize,
    },

    /// Ciphertext failed PKCS#7 unpadding (wrong key, IV, or truncation).
    #[error("bad padding in ciphertext")]
    BadPadding,

    /// DER key material failed to parse.
    #[error("malformed key material: {0}")]
    MalformedKey(String),

    /// Underlying RSA operation failed (payload too long, wrong key, ...).
    #[error("RSA operation failed: {0}")]
    Rsa(String),
}
