//! RecordStore - abstract keyed storage for ledger records.

use super::{Merged, Record, StoreError, Versioned};

/// Abstract keyed storage for [`Record`]s.
///
/// Implementations must make [`RecordStore::upsert_with`] atomic per key: the
/// merge closure sees the current value and its result is written without any
/// other writer interleaving. SQL backends express this as a transactional
/// upsert, KV backends as compare-and-set.
pub trait RecordStore: Send + Sync {
    /// Get a record by key. Returns None if not found.
    fn get<M: Record>(&self, key: &str) -> Result<Option<Versioned<M>>, StoreError>;

    /// Insert a new record. Fails with `AlreadyExists` if the key is taken.
    fn insert<M: Record>(&self, record: &M) -> Result<Versioned<M>, StoreError>;

    /// Replace an existing record if it is still at `expected_version`.
    fn update<M: Record>(
        &self,
        record: &M,
        expected_version: u64,
    ) -> Result<Versioned<M>, StoreError>;

    /// Atomically merge into the record stored under `key`.
    ///
    /// `merge` receives the current value (None if absent) and returns the
    /// value to store. A merge whose encoded bytes equal the stored bytes is a
    /// no-op and keeps the version unchanged.
    fn upsert_with<M, F>(&self, key: &str, merge: F) -> Result<Merged<M>, StoreError>
    where
        M: Record,
        F: FnOnce(Option<&M>) -> M;

    /// Delete a record by key. Returns true if it existed.
    fn delete<M: Record>(&self, key: &str) -> Result<bool, StoreError>;

    /// Find records of one collection matching a predicate.
    fn find<M: Record>(
        &self,
        predicate: &dyn Fn(&M) -> bool,
    ) -> Result<Vec<Versioned<M>>, StoreError>;
}
