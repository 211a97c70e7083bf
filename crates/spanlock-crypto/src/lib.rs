//! Spanlock Cryptographic Primitives
//!
//! Building blocks for the three-layer key hierarchy. Pure functions with
//! deterministic outputs; randomness (IVs, RSA blinding, key generation) is
//! always supplied by the caller, which keeps every operation reproducible
//! under a seeded RNG in tests.
//!
//! # Key Hierarchy
//!
//! ```text
//! Consumer key (RSA, per consumer)
//!        │ unwraps
//!        ▼
//! D-KEY (RSA private, per group and validity span)
//!        │ unwraps
//!        ▼
//! C-KEY (AES-128, per namespace and hour)
//!        │ decrypts
//!        ▼
//! Content (AES-CBC ciphertext)
//! ```
//!
//! Each layer is wrapped under the one above it: content under the hourly
//! content key, the content key under every covering E-KEY (the public half
//! of a D-KEY), and the D-KEY itself under a fresh nonce key that is in turn
//! wrapped under a consumer's public key.
//!
//! # Key Material
//!
//! Keys cross the rest of the system as canonical DER buffers (PKCS#8 for
//! private keys, SPKI for public keys); only this crate parses them. The
//! role-typed wrappers ([`ContentKey`], [`EKeyPublic`], [`DKeyPrivate`],
//! [`ConsumerPrivate`]) exist to keep the roles apart at call sites; the
//! wire format is unchanged raw bytes. Secret-carrying wrappers zeroize on
//! drop.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod aes;
pub mod error;
pub mod keys;
pub mod rsa;

pub use error::CryptoError;
pub use keys::{ConsumerPrivate, ContentKey, DKeyPrivate, EKeyPublic};
pub use rsa::RsaScheme;

/// AES block and IV size in bytes.
pub const AES_BLOCK_SIZE: usize = 16;

/// Content keys are AES-128.
pub const CONTENT_KEY_SIZE: usize = 16;
