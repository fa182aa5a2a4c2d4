//! RecordRepository - typed accessor over a RecordStore.

use std::marker::PhantomData;

use super::{Merged, Record, RecordStore, StoreError, Versioned};

/// Typed view of one collection in a [`RecordStore`].
pub struct RecordRepository<'a, S, M> {
    store: &'a S,
    _marker: PhantomData<M>,
}

impl<'a, S: RecordStore, M: Record> RecordRepository<'a, S, M> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Versioned<M>>, StoreError> {
        self.store.get(key)
    }

    pub fn insert(&self, record: &M) -> Result<Versioned<M>, StoreError> {
        self.store.insert(record)
    }

    pub fn update(&self, record: &M, expected_version: u64) -> Result<Versioned<M>, StoreError> {
        self.store.update(record, expected_version)
    }

    pub fn upsert_with<F>(&self, key: &str, merge: F) -> Result<Merged<M>, StoreError>
    where
        F: FnOnce(Option<&M>) -> M,
    {
        self.store.upsert_with(key, merge)
    }

    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.store.delete::<M>(key)
    }

    pub fn find(&self, predicate: &dyn Fn(&M) -> bool) -> Result<Vec<Versioned<M>>, StoreError> {
        self.store.find(predicate)
    }
}

/// Extension trait for typed record access on any [`RecordStore`].
pub trait RecordsExt: RecordStore + Sized {
    fn records<M: Record>(&self) -> RecordRepository<'_, Self, M> {
        RecordRepository::new(self)
    }
}

impl<S: RecordStore> RecordsExt for S {}
