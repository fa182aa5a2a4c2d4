//! InMemoryRecordStore - BTreeMap-backed record store.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Merged, Record, RecordStore, StoreError, Versioned};

/// Internal stored representation of a record.
#[derive(Debug, Clone)]
pub(super) struct StoredRecord {
    pub(super) bytes: Vec<u8>,
    pub(super) version: u64,
}

/// In-memory record store.
///
/// Storage key is `"COLLECTION:key"`. Values are JSON-encoded so that a
/// no-op merge can be detected by comparing bytes. Clone-friendly via Arc;
/// clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    pub(super) storage: Arc<RwLock<BTreeMap<String, StoredRecord>>>,
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all collections.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }

    fn make_key(collection: &str, key: &str) -> String {
        format!("{}:{}", collection, key)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredRecord>>, StoreError> {
        self.storage
            .read()
            .map_err(|_| StoreError::Storage("record store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredRecord>>, StoreError> {
        self.storage
            .write()
            .map_err(|_| StoreError::Storage("record store lock poisoned".into()))
    }
}

fn encode<M: Record>(record: &M) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(record).map_err(|e| StoreError::Serde(e.to_string()))
}

fn decode<M: Record>(bytes: &[u8]) -> Result<M, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Serde(e.to_string()))
}

impl RecordStore for InMemoryRecordStore {
    fn get<M: Record>(&self, key: &str) -> Result<Option<Versioned<M>>, StoreError> {
        let storage = self.read()?;
        match storage.get(&Self::make_key(M::COLLECTION, key)) {
            Some(stored) => Ok(Some(Versioned {
                data: decode(&stored.bytes)?,
                version: stored.version,
            })),
            None => Ok(None),
        }
    }

    fn insert<M: Record>(&self, record: &M) -> Result<Versioned<M>, StoreError> {
        let key = record.key();
        let bytes = encode(record)?;

        let mut storage = self.write()?;
        let full_key = Self::make_key(M::COLLECTION, &key);
        if storage.contains_key(&full_key) {
            return Err(StoreError::AlreadyExists {
                collection: M::COLLECTION.to_string(),
                key,
            });
        }

        storage.insert(full_key, StoredRecord { bytes, version: 1 });

        Ok(Versioned {
            data: record.clone(),
            version: 1,
        })
    }

    fn update<M: Record>(
        &self,
        record: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, StoreError> {
        let key = record.key();
        let bytes = encode(record)?;

        let mut storage = self.write()?;
        let stored = storage
            .get_mut(&Self::make_key(M::COLLECTION, &key))
            .ok_or_else(|| StoreError::NotFound {
                collection: M::COLLECTION.to_string(),
                key: key.clone(),
            })?;

        if stored.version != expected_version {
            return Err(StoreError::ConcurrencyConflict {
                collection: M::COLLECTION.to_string(),
                key,
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.bytes = bytes;
        stored.version += 1;

        Ok(Versioned {
            data: record.clone(),
            version: stored.version,
        })
    }

    fn upsert_with<M, F>(&self, key: &str, merge: F) -> Result<Merged<M>, StoreError>
    where
        M: Record,
        F: FnOnce(Option<&M>) -> M,
    {
        let full_key = Self::make_key(M::COLLECTION, key);

        // The write guard is held across read, merge and write.
        let mut storage = self.write()?;

        let previous = match storage.get(&full_key) {
            Some(stored) => Some(Versioned {
                data: decode::<M>(&stored.bytes)?,
                version: stored.version,
            }),
            None => None,
        };

        let merged = merge(previous.as_ref().map(|p| &p.data));
        if merged.key() != key {
            return Err(StoreError::KeyMismatch {
                collection: M::COLLECTION.to_string(),
                expected: key.to_string(),
                actual: merged.key(),
            });
        }
        let bytes = encode(&merged)?;

        let version = match storage.get_mut(&full_key) {
            Some(stored) if stored.bytes == bytes => stored.version,
            Some(stored) => {
                stored.bytes = bytes;
                stored.version += 1;
                stored.version
            }
            None => {
                storage.insert(full_key, StoredRecord { bytes, version: 1 });
                1
            }
        };

        Ok(Merged {
            previous,
            current: Versioned {
                data: merged,
                version,
            },
        })
    }

    fn delete<M: Record>(&self, key: &str) -> Result<bool, StoreError> {
        let mut storage = self.write()?;
        Ok(storage
            .remove(&Self::make_key(M::COLLECTION, key))
            .is_some())
    }

    fn find<M: Record>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Vec<Versioned<M>>, StoreError> {
        let storage = self.read()?;
        let prefix = format!("{}:", M::COLLECTION);

        let mut results = Vec::new();
        for (_, stored) in storage
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            let data: M = decode(&stored.bytes)?;
            if predicate(&data) {
                results.push(Versioned {
                    data,
                    version: stored.version,
                });
            }
        }

        Ok(results)
    }
}
