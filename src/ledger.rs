//! ProgressLedger - the entry point the HTTP layer calls into.
//!
//! Every mutation of an enrollment runs under that enrollment's lock:
//!
//! 1. validate the report and resolve the lesson through the catalog
//! 2. acquire the `(user, course)` lock
//! 3. require an enrollment
//! 4. on a completion transition, consult the consistency gate
//! 5. merge the report into the progress record (atomic upsert)
//! 6. recompute the enrollment from scratch
//!
//! Notices are emitted after the lock is released. Idle per-enrollment locks
//! are evicted on release, so the lock manager only tracks enrollments that
//! are being written right now.

use std::collections::BTreeSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, Lesson, LessonCatalog};
use crate::config::LedgerConfig;
#[cfg(feature = "emitter")]
use crate::emitter::LedgerEmitter;
use crate::enrollment::{Enrollment, EnrollmentAggregator};
use crate::error::LedgerError;
use crate::gate::{ConsistencyGate, GateDecision};
use crate::lock::{InMemoryLockManager, LockManager};
use crate::notice::LedgerNotice;
use crate::progress::{ProgressRecord, ProgressReport, ProgressStore};
use crate::record::{InMemoryRecordStore, RecordStore, RecordsExt};

/// What a successful [`ProgressLedger::record_progress`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressOutcome {
    pub record: ProgressRecord,
    pub enrollment: Enrollment,
    /// False when the report was a duplicate and nothing was written.
    pub changed: bool,
    /// This report moved the lesson to completed.
    pub lesson_completed: bool,
    /// This report finished the course.
    pub course_completed: bool,
}

impl ProgressOutcome {
    pub fn notices(&self) -> Vec<LedgerNotice> {
        let mut notices = Vec::new();
        if let (true, Some(at)) = (self.lesson_completed, self.record.completed_at) {
            notices.push(LedgerNotice::LessonCompleted {
                user_id: self.record.user_id.clone(),
                course_id: self.record.course_id.clone(),
                lesson_id: self.record.lesson_id.clone(),
                completed_at: at,
            });
        }
        if let (true, Some(at)) = (self.course_completed, self.enrollment.completed_at) {
            notices.push(LedgerNotice::CourseCompleted {
                user_id: self.enrollment.user_id.clone(),
                course_id: self.enrollment.course_id.clone(),
                completed_at: at,
            });
        }
        notices
    }
}

/// Enrollment and lesson-progress ledger.
///
/// Generic over the catalog it reads, the store it writes, and the lock
/// manager that serializes writers per enrollment.
pub struct ProgressLedger<C, S = InMemoryRecordStore, L = InMemoryLockManager> {
    catalog: C,
    store: S,
    locks: L,
    config: LedgerConfig,
    #[cfg(feature = "emitter")]
    emitter: LedgerEmitter,
}

impl<C: LessonCatalog> ProgressLedger<C> {
    /// Ledger over in-memory storage and process-local locks.
    pub fn in_memory(catalog: C) -> Self {
        Self::new(
            catalog,
            InMemoryRecordStore::new(),
            InMemoryLockManager::new(),
            LedgerConfig::default(),
        )
    }
}

impl<C, S, L> ProgressLedger<C, S, L>
where
    C: LessonCatalog,
    S: RecordStore,
    L: LockManager,
{
    pub fn new(catalog: C, store: S, locks: L, config: LedgerConfig) -> Self {
        Self {
            catalog,
            store,
            locks,
            config,
            #[cfg(feature = "emitter")]
            emitter: LedgerEmitter::new(),
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn locks(&self) -> &L {
        &self.locks
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Listen for `"LessonCompleted"` / `"CourseCompleted"` notices (JSON payloads).
    #[cfg(feature = "emitter")]
    pub fn on<F>(&self, event: &str, listener: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        self.emitter.on(event, listener);
    }

    /// Enroll a learner. Enrolling twice returns the existing enrollment.
    pub fn enroll(&self, user_id: &str, course_id: &str) -> Result<Enrollment, LedgerError> {
        require_id("user id", user_id)?;
        require_id("course id", course_id)?;

        self.with_enrollment_lock(user_id, course_id, || {
            self.aggregator().enroll(user_id, course_id, Utc::now())
        })
    }

    /// Apply one progress report and recompute the owning enrollment.
    pub fn record_progress(&self, report: ProgressReport) -> Result<ProgressOutcome, LedgerError> {
        report.validate()?;

        let lesson = self.lesson_for_progress(&report.lesson_id)?;
        let user_id = report.user_id.as_str();
        let course_id = lesson.course_id.as_str();
        let at = report.occurred_at.unwrap_or_else(Utc::now);

        let outcome = self.with_enrollment_lock(user_id, course_id, || {
            let before = self
                .store
                .records::<Enrollment>()
                .get(&Enrollment::key_for(user_id, course_id))?
                .ok_or_else(|| LedgerError::NotEnrolled {
                    user_id: user_id.to_string(),
                    course_id: course_id.to_string(),
                })?
                .data;

            let progress = ProgressStore::new(&self.store);
            let was_completed = progress
                .get_record(user_id, &lesson.id)?
                .is_some_and(|r| r.is_completed);

            if report.is_completed && !was_completed {
                if let GateDecision::Deny(reason) = self.gate().can_complete(user_id, &lesson)? {
                    info!(user_id, lesson_id = %lesson.id, %reason, "completion denied");
                    return Err(LedgerError::ConsistencyViolation(reason));
                }
            }

            let merged = progress.upsert(&report, &lesson, at)?;
            let changed = merged.changed();
            let record = merged.current.data;

            let enrollment = self.aggregator().recompute(user_id, course_id, at)?;

            Ok(ProgressOutcome {
                lesson_completed: record.is_completed && !was_completed,
                course_completed: enrollment.completed_at.is_some() && before.completed_at.is_none(),
                changed,
                record,
                enrollment,
            })
        })?;

        debug!(
            user_id,
            lesson_id = %outcome.record.lesson_id,
            changed = outcome.changed,
            progress = outcome.enrollment.progress(),
            "progress recorded"
        );
        self.publish(&outcome);

        Ok(outcome)
    }

    /// Recompute an enrollment from the stored progress records.
    ///
    /// Call after publishing or unpublishing lessons. If this brings the
    /// course to 100, `completed_at` is the server clock now.
    pub fn recompute(&self, user_id: &str, course_id: &str) -> Result<Enrollment, LedgerError> {
        require_id("user id", user_id)?;
        require_id("course id", course_id)?;

        self.with_enrollment_lock(user_id, course_id, || {
            self.aggregator().recompute(user_id, course_id, Utc::now())
        })
    }

    pub fn get_record(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<ProgressRecord>, LedgerError> {
        require_id("user id", user_id)?;
        require_id("lesson id", lesson_id)?;
        Ok(ProgressStore::new(&self.store).get_record(user_id, lesson_id)?)
    }

    pub fn enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, LedgerError> {
        require_id("user id", user_id)?;
        require_id("course id", course_id)?;
        Ok(self
            .store
            .records::<Enrollment>()
            .get(&Enrollment::key_for(user_id, course_id))?
            .map(|v| v.data))
    }

    pub fn completed_lesson_ids(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<BTreeSet<String>, LedgerError> {
        require_id("user id", user_id)?;
        require_id("course id", course_id)?;
        self.catalog.course(course_id)?;
        Ok(ProgressStore::new(&self.store).completed_lesson_ids(user_id, course_id)?)
    }

    /// Would completing `lesson_id` pass the consistency gate right now?
    pub fn can_complete(&self, user_id: &str, lesson_id: &str) -> Result<GateDecision, LedgerError> {
        require_id("user id", user_id)?;
        require_id("lesson id", lesson_id)?;
        let lesson = self.lesson_for_progress(lesson_id)?;
        self.gate().can_complete(user_id, &lesson)
    }

    /// Fail with `LessonInUse` if any learner has progress on `lesson_id`.
    ///
    /// Authoring tools call this before deleting a lesson from the catalog.
    pub fn check_lesson_removal(&self, lesson_id: &str) -> Result<(), LedgerError> {
        require_id("lesson id", lesson_id)?;
        let records = ProgressStore::new(&self.store).records_for_lesson(lesson_id)?;
        if records.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::LessonInUse {
                lesson_id: lesson_id.to_string(),
                records: records.len(),
            })
        }
    }

    /// Run `f` holding the `(user, course)` lock, then drop the lock entry
    /// if no other writer is using it.
    fn with_enrollment_lock<T, F>(
        &self,
        user_id: &str,
        course_id: &str,
        f: F,
    ) -> Result<T, LedgerError>
    where
        F: FnOnce() -> Result<T, LedgerError>,
    {
        let key = Enrollment::key_for(user_id, course_id);
        let result = {
            let _guard = self.locks.acquire(&key)?;
            f()
        };
        if let Err(err) = self.locks.evict_idle(&key) {
            warn!(key = %key, error = %err, "failed to evict idle enrollment lock");
        }
        result
    }

    fn lesson_for_progress(&self, lesson_id: &str) -> Result<Lesson, LedgerError> {
        match self.catalog.lesson(lesson_id) {
            Ok(lesson) => Ok(lesson),
            Err(CatalogError::LessonNotFound(id)) => Err(LedgerError::UnknownLesson(id)),
            Err(err) => Err(err.into()),
        }
    }

    fn gate(&self) -> ConsistencyGate<'_, C, S> {
        ConsistencyGate::new(&self.catalog, &self.store)
    }

    fn aggregator(&self) -> EnrollmentAggregator<'_, C, S> {
        EnrollmentAggregator::new(&self.catalog, &self.store, &self.config)
    }

    fn publish(&self, outcome: &ProgressOutcome) {
        for notice in outcome.notices() {
            info!(event = notice.event_type(), user_id = %outcome.record.user_id, "ledger notice");
            #[cfg(feature = "emitter")]
            self.emitter.emit(&notice);
        }
    }
}

fn require_id(field: &str, value: &str) -> Result<(), LedgerError> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{field} is empty")));
    }
    Ok(())
}
