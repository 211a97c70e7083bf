//! The persistent key database.
//!
//! Two keyed blob families behind one trait: a consumer's own decrypt keys
//! (by full key name) and the producer's hourly content keys (by timeslot).
//! Content-key lookups collapse to the hour: every timestamp inside one UTC
//! hour resolves to the same entry, which is what makes content keys
//! hour-bucketed without the engines repeating the rounding.
//!
//! The trait is synchronous and assumes single-writer semantics within one
//! process; implementations share state through cheap clones.

mod error;
mod memory;
mod redb;

pub use error::StoreError;
pub use memory::MemoryKeyStore;
use serde::{Deserialize, Serialize};
use spanlock_crypto::{ConsumerPrivate, ContentKey};
use spanlock_proto::{Name, Timestamp};

pub use self::redb::RedbKeyStore;

/// Stored representation of one key, CBOR-encoded in durable backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeyRecord {
    /// Raw key material (DER for consumer keys, AES bits for content keys).
    pub key_bits: Vec<u8>,
    /// Unix milliseconds at insertion time.
    pub created_at_ms: u64,
}

/// Keyed blob store for consumer decrypt keys and hourly content keys.
///
/// Must be `Clone` (handed to engines), `Send + Sync`, and synchronous.
/// Implementations typically share internal state via `Arc`.
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Persist a consumer decrypt key under its full key name.
    ///
    /// Overwrites any existing entry for the name.
    fn insert_decrypt_key(&self, name: &Name, key: &ConsumerPrivate) -> Result<(), StoreError>;

    /// Load a consumer decrypt key. `None` when absent.
    fn decrypt_key(&self, name: &Name) -> Result<Option<ConsumerPrivate>, StoreError>;

    /// True when a content key exists for the hour containing `timeslot`.
    fn has_content_key(&self, timeslot: Timestamp) -> Result<bool, StoreError>;

    /// Load the content key for the hour containing `timeslot`.
    fn content_key(&self, timeslot: Timestamp) -> Result<Option<ContentKey>, StoreError>;

    /// Persist a content key for the hour containing `timeslot`.
    ///
    /// # Invariants
    ///
    /// - At most one content key per hour: inserting into an occupied hour is
    ///   a no-op, preserving the first key.
    fn insert_content_key(&self, timeslot: Timestamp, key: &ContentKey) -> Result<(), StoreError>;
}
