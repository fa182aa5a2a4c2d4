//! Enrollment and lesson-progress ledger.
//!
//! Learners report lesson progress; the ledger keeps one sticky record per
//! `(user, lesson)` and derives each enrollment's percent-complete from those
//! records and the lessons currently published. Clients never supply a
//! percentage.
//!
//! ```ignore
//! use progress_ledger::{Course, InMemoryCatalog, Lesson, ProgressLedger, ProgressReport};
//!
//! let catalog = InMemoryCatalog::new();
//! catalog.add_course(Course::new("rust-101", "Intro to Rust"))?;
//! catalog.add_lesson(Lesson::new("ownership", "rust-101", 1, 600))?;
//!
//! let ledger = ProgressLedger::in_memory(catalog);
//! ledger.enroll("user-1", "rust-101")?;
//! let outcome = ledger.record_progress(
//!     ProgressReport::new("user-1", "ownership").watched(600.0).completed(),
//! )?;
//! assert_eq!(outcome.enrollment.progress(), 100);
//! ```

// Lets `#[derive(Record)]` expand to `progress_ledger::Record` inside this crate too.
extern crate self as progress_ledger;

pub mod catalog;
pub mod config;
#[cfg(feature = "emitter")]
pub mod emitter;
pub mod enrollment;
pub mod error;
pub mod gate;
pub mod ledger;
pub mod lock;
pub mod notice;
pub mod progress;
pub mod record;

pub use catalog::{CatalogError, Course, InMemoryCatalog, Lesson, LessonCatalog};
pub use config::{ConfigError, LedgerConfig};
#[cfg(feature = "emitter")]
pub use emitter::LedgerEmitter;
pub use enrollment::{Enrollment, EnrollmentAggregator, EnrollmentView};
pub use error::LedgerError;
pub use gate::{ConsistencyGate, DenyReason, GateDecision};
pub use ledger::{ProgressLedger, ProgressOutcome};
pub use lock::{InMemoryLock, InMemoryLockManager, Lock, LockError, LockGuard, LockManager};
pub use notice::LedgerNotice;
pub use progress::{ProgressRecord, ProgressReport, ProgressStore};
pub use record::{
    InMemoryRecordStore, Merged, Record, RecordRepository, RecordStore, RecordsExt, StoreError,
    Versioned,
};

// Re-export the derive macro
pub use progress_ledger_macros::Record;
