//! Records - keyed, versioned storage for ledger state.
//!
//! Progress records and enrollments are both stored as [`Record`]s: typed,
//! serde-encoded values addressed by `collection:key`, each carrying a version
//! for optimistic concurrency.
//!
//! ## Example
//!
//! ```ignore
//! use progress_ledger::{InMemoryRecordStore, Record, RecordsExt};
//!
//! #[derive(Serialize, Deserialize, Clone, PartialEq, Record)]
//! #[record(collection = "bookmarks")]
//! struct Bookmark {
//!     #[record(key)]
//!     pub user_id: String,
//!     #[record(key)]
//!     pub lesson_id: String,
//!     pub position: f64,
//! }
//!
//! let store = InMemoryRecordStore::new();
//! store.records::<Bookmark>().insert(&bookmark)?;
//! let loaded = store.records::<Bookmark>().get("user-1:lesson-1")?;
//! ```

mod in_memory;
mod repository;
mod snapshot;
mod store;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Trait for types that can be kept in a [`RecordStore`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection name (a table in SQL, a key prefix in a KV store).
    const COLLECTION: &'static str;

    /// Storage key of this instance within its collection.
    fn key(&self) -> String;
}

/// Join key components with `:`, escaping `\` and `:` inside each one.
///
/// Keeps composite keys injective: `("a:b", "x")` and `("a", "b:x")` map to
/// `a\:b:x` and `a:b\:x`.
pub fn composite_key<I, P>(parts: I) -> String
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(':');
        }
        for ch in part.as_ref().chars() {
            if ch == '\\' || ch == ':' {
                key.push('\\');
            }
            key.push(ch);
        }
    }
    key
}

/// A record together with the version it was read or written at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub data: T,
    pub version: u64,
}

/// Result of an atomic read-merge-write.
#[derive(Debug, Clone)]
pub struct Merged<T> {
    /// State before the merge, if the key existed.
    pub previous: Option<Versioned<T>>,
    /// State after the merge.
    pub current: Versioned<T>,
}

impl<T> Merged<T> {
    /// True when the merge wrote something (created the key or changed its bytes).
    pub fn changed(&self) -> bool {
        self.previous
            .as_ref()
            .map_or(true, |prev| prev.version != self.current.version)
    }
}

/// Error type for record store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Optimistic concurrency conflict.
    #[error("concurrency conflict on {collection}:{key} (expected version {expected}, actual {actual})")]
    ConcurrencyConflict {
        collection: String,
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Insert of a key that is already present.
    #[error("record already exists: {collection}:{key}")]
    AlreadyExists { collection: String, key: String },

    /// Update of a key that is not present.
    #[error("record not found: {collection}:{key}")]
    NotFound { collection: String, key: String },

    /// A merge produced a record whose key differs from the one being merged.
    #[error("merge for {collection}:{expected} produced key {actual}")]
    KeyMismatch {
        collection: String,
        expected: String,
        actual: String,
    },

    /// Serialization/deserialization error.
    #[error("record serialization error: {0}")]
    Serde(String),

    /// Storage-level error (poisoned lock, lost connection, ...).
    #[error("record storage error: {0}")]
    Storage(String),
}

pub use in_memory::InMemoryRecordStore;
pub use repository::{RecordRepository, RecordsExt};
pub use store::RecordStore;
