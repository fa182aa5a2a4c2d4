//! Point-in-time snapshots of an [`InMemoryRecordStore`].
//!
//! A snapshot captures every key with its encoded bytes and version, so a
//! restored store continues optimistic concurrency from the same versions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::in_memory::{InMemoryRecordStore, StoredRecord};
use super::StoreError;

const SNAPSHOT_FORMAT: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotEntry {
    key: String,
    bytes: Vec<u8>,
    version: u64,
}

#[derive(Serialize, Deserialize)]
struct StoreSnapshot {
    format: u32,
    entries: Vec<SnapshotEntry>,
}

impl InMemoryRecordStore {
    /// Encode the whole store with bitcode.
    pub fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| StoreError::Storage("record store lock poisoned".into()))?;

        let snapshot = StoreSnapshot {
            format: SNAPSHOT_FORMAT,
            entries: storage
                .iter()
                .map(|(key, stored)| SnapshotEntry {
                    key: key.clone(),
                    bytes: stored.bytes.clone(),
                    version: stored.version,
                })
                .collect(),
        };

        bitcode::serialize(&snapshot).map_err(|e| StoreError::Serde(format!("snapshot encode: {e}")))
    }

    /// Rebuild a store from [`InMemoryRecordStore::snapshot`] output.
    pub fn restore(bytes: &[u8]) -> Result<Self, StoreError> {
        let snapshot: StoreSnapshot = bitcode::deserialize(bytes)
            .map_err(|e| StoreError::Serde(format!("snapshot decode: {e}")))?;

        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(StoreError::Serde(format!(
                "unsupported snapshot format {}",
                snapshot.format
            )));
        }

        let storage: BTreeMap<String, StoredRecord> = snapshot
            .entries
            .into_iter()
            .map(|entry| {
                (
                    entry.key,
                    StoredRecord {
                        bytes: entry.bytes,
                        version: entry.version,
                    },
                )
            })
            .collect();

        Ok(Self {
            storage: Arc::new(RwLock::new(storage)),
        })
    }

    /// Write a snapshot to `path`.
    pub fn save_snapshot<P: AsRef<Path>>(&self, path: P) -> Result<(), StoreError> {
        let bytes = self.snapshot()?;
        std::fs::write(path, bytes).map_err(|e| StoreError::Storage(e.to_string()))
    }

    /// Read a snapshot previously written by [`InMemoryRecordStore::save_snapshot`].
    pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::Storage(e.to_string()))?;
        Self::restore(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Record, RecordStore};

    #[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Record)]
    #[record(collection = "notes")]
    struct Note {
        id: String,
        body: String,
    }

    #[test]
    fn restore_preserves_data_and_versions() {
        let store = InMemoryRecordStore::new();
        let note = Note {
            id: "n1".into(),
            body: "first".into(),
        };
        store.insert(&note).unwrap();
        store
            .update(
                &Note {
                    body: "second".into(),
                    ..note
                },
                1,
            )
            .unwrap();

        let bytes = store.snapshot().unwrap();
        let restored = InMemoryRecordStore::restore(&bytes).unwrap();

        let loaded = restored.get::<Note>("n1").unwrap().unwrap();
        assert_eq!(loaded.data.body, "second");
        assert_eq!(loaded.version, 2);
    }

    #[test]
    fn restored_store_is_independent() {
        let store = InMemoryRecordStore::new();
        let bytes = store.snapshot().unwrap();
        let restored = InMemoryRecordStore::restore(&bytes).unwrap();

        store
            .insert(&Note {
                id: "n1".into(),
                body: "x".into(),
            })
            .unwrap();
        assert!(restored.is_empty().unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        let err = InMemoryRecordStore::restore(b"not a snapshot").unwrap_err();
        assert!(matches!(err, StoreError::Serde(_)));
    }

    #[test]
    fn snapshot_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.snapshot");

        let store = InMemoryRecordStore::new();
        store
            .insert(&Note {
                id: "n1".into(),
                body: "on disk".into(),
            })
            .unwrap();
        store.save_snapshot(&path).unwrap();

        let loaded = InMemoryRecordStore::load_snapshot(&path).unwrap();
        assert_eq!(
            loaded.get::<Note>("n1").unwrap().unwrap().data.body,
            "on disk"
        );
    }
}
