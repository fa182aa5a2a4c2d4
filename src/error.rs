//! Errors surfaced by the ledger to its caller (usually an HTTP layer).

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::gate::DenyReason;
use crate::lock::LockError;
use crate::record::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Unknown course (or lesson, outside of progress reporting).
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Progress reported for a course the learner never joined.
    #[error("user {user_id} is not enrolled in course {course_id}")]
    NotEnrolled { user_id: String, course_id: String },

    /// Progress reported for a lesson the catalog does not know.
    #[error("unknown lesson: {0}")]
    UnknownLesson(String),

    /// The consistency gate refused a completion. Nothing was written.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(DenyReason),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An authoring change to the catalog was rejected.
    #[error("invalid catalog change: {0}")]
    InvalidCatalog(String),

    /// A lesson with learner progress cannot be removed.
    #[error("lesson {lesson_id} has {records} progress record(s)")]
    LessonInUse { lesson_id: String, records: usize },

    /// Enrollment writes kept conflicting.
    #[error("gave up on {key} after {attempts} conflicting attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl LedgerError {
    /// True for conditions the caller can fix and retry (4xx).
    pub fn is_recoverable(&self) -> bool {
        self.status_code() < 500
    }

    /// HTTP status the error maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::NotFound { .. } | LedgerError::UnknownLesson(_) => 404,
            LedgerError::NotEnrolled { .. } => 403,
            LedgerError::ConsistencyViolation(_) | LedgerError::LessonInUse { .. } => 409,
            LedgerError::InvalidInput(_) | LedgerError::InvalidCatalog(_) => 422,
            LedgerError::RetriesExhausted { .. } => 503,
            LedgerError::Store(_) | LedgerError::Lock(_) => 500,
        }
    }
}

impl From<CatalogError> for LedgerError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::CourseNotFound(id) => LedgerError::NotFound { kind: "course", id },
            CatalogError::LessonNotFound(id) => LedgerError::NotFound { kind: "lesson", id },
            CatalogError::Invalid(msg) => LedgerError::InvalidCatalog(msg),
            CatalogError::Storage(msg) => LedgerError::Store(StoreError::Storage(msg)),
        }
    }
}
