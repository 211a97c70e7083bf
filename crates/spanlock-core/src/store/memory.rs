#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use spanlock_crypto::{ConsumerPrivate, ContentKey};
use spanlock_proto::{Name, Timestamp};

use super::{KeyStore, StoreError};

/// In-memory key store for testing and simulation.
///
/// `HashMap`s behind an `Arc<Mutex<..>>` so clones share state. Uses
/// `lock().expect()`, which panics if the mutex is poisoned - acceptable for
/// test code.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<MemoryKeyStoreInner>>,
}

#[derive(Default)]
struct MemoryKeyStoreInner {
    /// Consumer decrypt keys by canonical name encoding.
    decrypt_keys: HashMap<Vec<u8>, ConsumerPrivate>,

    /// Content keys by hour-slot unix milliseconds.
    content_keys: HashMap<u64, ContentKey>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored content keys (= distinct hours touched).
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn content_key_count(&self) -> usize {
        self.inner.lock().expect("Mutex poisoned").content_keys.len()
    }
}

impl KeyStore for MemoryKeyStore {
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn insert_decrypt_key(&self, name: &Name, key: &ConsumerPrivate) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .decrypt_keys
            .insert(name.encode().to_vec(), key.clone());
        Ok(())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn decrypt_key(&self, name: &Name) -> Result<Option<ConsumerPrivate>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.decrypt_keys.get(name.encode().as_ref()).cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn has_content_key(&self, timeslot: Timestamp) -> Result<bool, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner
            .content_keys
            .contains_key(&timeslot.hour_slot().unix_millis()))
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn content_key(&self, timeslot: Timestamp) -> Result<Option<ContentKey>, StoreError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner
            .content_keys
            .get(&timeslot.hour_slot().unix_millis())
            .cloned())
    }

    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    fn insert_content_key(&self, timeslot: Timestamp, key: &ContentKey) -> Result<(), StoreError> {
        self.inner
            .lock()
            .expect("Mutex poisoned")
            .content_keys
            .entry(timeslot.hour_slot().unix_millis())
            .or_insert_with(|| key.clone());
        Ok(())
    }
}
