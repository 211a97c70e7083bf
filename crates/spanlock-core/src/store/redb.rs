//! Redb-backed durable key store.
//!
//! Redb's ACID transactions give crash safety; every key survives process
//! restarts. Values are CBOR-encoded [`StoredKeyRecord`]s so the schema can
//! grow without a table migration.

use std::{
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use redb::{Database, ReadableTable, TableDefinition};
use spanlock_crypto::{ConsumerPrivate, ContentKey};
use spanlock_proto::{Name, Timestamp};
use tracing::debug;

use super::{KeyStore, StoreError, StoredKeyRecord};

/// Table: consumer decrypt keys.
/// Key: canonical name encoding. Value: CBOR `StoredKeyRecord`.
const DECRYPT_KEYS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("decrypt_keys");

/// Table: hourly content keys.
/// Key: hour-slot unix milliseconds as big-endian bytes [8 bytes].
/// Value: CBOR `StoredKeyRecord`.
const CONTENT_KEYS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("content_keys");

/// Durable key store backed by redb.
///
/// Thread-safe through redb's internal locking. Clone is cheap (`Arc`).
#[derive(Clone)]
pub struct RedbKeyStore {
    db: Arc<Database>,
}

impl RedbKeyStore {
    /// Open or create a database at `path`, creating both tables.
    ///
    /// # Errors
    ///
    /// `StoreError::Io` when the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(|e| StoreError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let _ = txn
                .open_table(DECRYPT_KEYS)
                .map_err(|e| StoreError::Io(e.to_string()))?;
            let _ = txn
                .open_table(CONTENT_KEYS)
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;

        debug!(path = %path.as_ref().display(), "opened key database");
        Ok(Self { db: Arc::new(db) })
    }

    fn put(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: &[u8],
        key_bits: &[u8],
        keep_existing: bool,
    ) -> Result<(), StoreError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        {
            let mut table = txn
                .open_table(table)
                .map_err(|e| StoreError::Io(e.to_string()))?;

            if keep_existing {
                let occupied = table
                    .get(key)
                    .map_err(|e| StoreError::Io(e.to_string()))?
                    .is_some();
                if occupied {
                    return Ok(());
                }
            }

            let record = StoredKeyRecord {
                key_bits: key_bits.to_vec(),
                created_at_ms: unix_millis_now(),
            };
            let mut value = Vec::new();
            ciborium::into_writer(&record, &mut value)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;

            table
                .insert(key, value.as_slice())
                .map_err(|e| StoreError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StoreError::Io(e.to_string()))?;
        Ok(())
    }

    fn get(
        &self,
        table: TableDefinition<'static, &'static [u8], &'static [u8]>,
        key: &[u8],
    ) -> Result<Option<StoredKeyRecord>, StoreError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let table = txn
            .open_table(table)
            .map_err(|e| StoreError::Io(e.to_string()))?;

        let Some(value) = table.get(key).map_err(|e| StoreError::Io(e.to_string()))? else {
            return Ok(None);
        };
        let record = ciborium::from_reader(value.value())
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }
}

impl KeyStore for RedbKeyStore {
    fn insert_decrypt_key(&self, name: &Name, key: &ConsumerPrivate) -> Result<(), StoreError> {
        self.put(DECRYPT_KEYS, &name.encode(), key.as_der(), false)
    }

    fn decrypt_key(&self, name: &Name) -> Result<Option<ConsumerPrivate>, StoreError> {
        Ok(self
            .get(DECRYPT_KEYS, &name.encode())?
            .map(|record| ConsumerPrivate::from_der(record.key_bits)))
    }

    fn has_content_key(&self, timeslot: Timestamp) -> Result<bool, StoreError> {
        Ok(self
            .get(CONTENT_KEYS, &content_key_key(timeslot))?
            .is_some())
    }

    fn content_key(&self, timeslot: Timestamp) -> Result<Option<ContentKey>, StoreError> {
        let Some(record) = self.get(CONTENT_KEYS, &content_key_key(timeslot))? else {
            return Ok(None);
        };
        let key = ContentKey::from_bytes(&record.key_bits)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        Ok(Some(key))
    }

    fn insert_content_key(&self, timeslot: Timestamp, key: &ContentKey) -> Result<(), StoreError> {
        self.put(CONTENT_KEYS, &content_key_key(timeslot), key.as_bytes(), true)
    }
}

fn content_key_key(timeslot: Timestamp) -> [u8; 8] {
    timeslot.hour_slot().unix_millis().to_be_bytes()
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
