//! Shared core for the spanlock engines.
//!
//! The producer and consumer crates both build on what lives here: the
//! access-error taxonomy every asynchronous entry point reports through, the
//! [`Face`] trait the engines fetch through, the signing and validation seams
//! ([`KeyChain`], [`Validator`]), the persistent key database
//! ([`KeyStore`] with memory and redb backends), and the encryptor helper
//! that turns a plaintext into a data object carrying an EncryptedContent.

#![forbid(unsafe_code)]

pub mod encryptor;
pub mod error;
pub mod face;
pub mod keychain;
pub mod store;

pub use encryptor::{decrypt_content, encrypt_data, EncryptParams};
pub use error::AccessError;
pub use face::{Face, FaceReply};
pub use keychain::{Ed25519KeyChain, Ed25519Validator, KeyChain, NullKeyChain, NullValidator, Validator};
pub use store::{KeyStore, MemoryKeyStore, RedbKeyStore, StoreError};
