use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::{ProgressRecord, ProgressReport};
use crate::catalog::Lesson;
use crate::record::{Merged, RecordStore, RecordsExt, StoreError};

/// Progress records over a [`RecordStore`].
///
/// Writes go through [`RecordStore::upsert_with`], so the max/sticky merge
/// runs as one atomic step even when two reports for the same
/// `(user, lesson)` race.
pub struct ProgressStore<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore> ProgressStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn get_record(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<ProgressRecord>, StoreError> {
        Ok(self
            .store
            .records::<ProgressRecord>()
            .get(&ProgressRecord::key_for(user_id, lesson_id))?
            .map(|v| v.data))
    }

    /// Merge `report` into the stored record for `(report.user_id, lesson.id)`.
    pub fn upsert(
        &self,
        report: &ProgressReport,
        lesson: &Lesson,
        now: DateTime<Utc>,
    ) -> Result<Merged<ProgressRecord>, StoreError> {
        let key = ProgressRecord::key_for(&report.user_id, &lesson.id);
        self.store
            .records::<ProgressRecord>()
            .upsert_with(&key, |existing| {
                ProgressRecord::merge(existing, report, lesson, now)
            })
    }

    /// Completed records of one learner in one course.
    pub fn completed_records(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self
            .store
            .records::<ProgressRecord>()
            .find(&|r| r.user_id == user_id && r.course_id == course_id && r.is_completed)?
            .into_iter()
            .map(|v| v.data)
            .collect())
    }

    pub fn completed_lesson_ids(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<BTreeSet<String>, StoreError> {
        Ok(self
            .completed_records(user_id, course_id)?
            .into_iter()
            .map(|r| r.lesson_id)
            .collect())
    }

    /// Every learner's record for one lesson.
    pub fn records_for_lesson(&self, lesson_id: &str) -> Result<Vec<ProgressRecord>, StoreError> {
        Ok(self
            .store
            .records::<ProgressRecord>()
            .find(&|r| r.lesson_id == lesson_id)?
            .into_iter()
            .map(|v| v.data)
            .collect())
    }
}
