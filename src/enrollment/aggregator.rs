use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::Enrollment;
use crate::catalog::LessonCatalog;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::progress::{ProgressRecord, ProgressStore};
use crate::record::{RecordStore, RecordsExt, StoreError};

/// Derives enrollment progress from progress records and the catalog.
///
/// Nothing here trusts a stored percentage or the course's authored
/// `lesson_count`: every recompute starts from the set of completed records
/// and the lessons that are published right now.
pub struct EnrollmentAggregator<'a, C, S> {
    catalog: &'a C,
    store: &'a S,
    config: &'a LedgerConfig,
}

impl<'a, C: LessonCatalog, S: RecordStore> EnrollmentAggregator<'a, C, S> {
    pub fn new(catalog: &'a C, store: &'a S, config: &'a LedgerConfig) -> Self {
        Self {
            catalog,
            store,
            config,
        }
    }

    /// Create the enrollment for `(user_id, course_id)` unless it exists.
    pub fn enroll(
        &self,
        user_id: &str,
        course_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, LedgerError> {
        self.catalog.course(course_id)?;

        match self
            .store
            .records::<Enrollment>()
            .insert(&Enrollment::new(user_id, course_id, now))
        {
            Ok(_) => info!(user_id, course_id, "enrolled"),
            Err(StoreError::AlreadyExists { .. }) => {
                debug!(user_id, course_id, "already enrolled");
            }
            Err(err) => return Err(err.into()),
        }

        self.recompute(user_id, course_id, now)
    }

    /// Recompute progress for one enrollment and persist it if it changed.
    ///
    /// `at` is the instant of whatever triggered the recompute: the report
    /// being applied, or the server clock for a standalone recompute. It
    /// becomes `completed_at` if this recompute brings progress to 100.
    pub fn recompute(
        &self,
        user_id: &str,
        course_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Enrollment, LedgerError> {
        let course = self.catalog.course(course_id)?;
        let lessons = self.catalog.course_lessons(course_id)?;
        let published: HashSet<&str> = lessons
            .iter()
            .filter(|l| l.is_published)
            .map(|l| l.id.as_str())
            .collect();

        if self.config.warn_on_lesson_count_mismatch
            && course.lesson_count as usize != published.len()
        {
            warn!(
                course_id,
                lesson_count = course.lesson_count,
                published = published.len(),
                "course lesson_count disagrees with published lessons; using published"
            );
        }

        let key = Enrollment::key_for(user_id, course_id);
        let attempts = self.config.max_commit_retries.saturating_add(1);
        let progress = ProgressStore::new(self.store);

        for attempt in 1..=attempts {
            let current = self
                .store
                .records::<Enrollment>()
                .get(&key)?
                .ok_or_else(|| LedgerError::NotEnrolled {
                    user_id: user_id.to_string(),
                    course_id: course_id.to_string(),
                })?;

            let completed = progress.completed_records(user_id, course_id)?;
            let next = derive(&current.data, &published, &completed, at);

            if next == current.data {
                return Ok(current.data);
            }

            match self
                .store
                .records::<Enrollment>()
                .update(&next, current.version)
            {
                Ok(stored) => {
                    debug!(
                        user_id,
                        course_id,
                        progress = stored.data.progress(),
                        version = stored.version,
                        "enrollment recomputed"
                    );
                    if current.data.completed_at.is_none() && stored.data.completed_at.is_some() {
                        info!(user_id, course_id, "course completed");
                    }
                    return Ok(stored.data);
                }
                Err(StoreError::ConcurrencyConflict { actual, .. }) => {
                    debug!(user_id, course_id, attempt, actual, "enrollment write conflict, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(user_id, course_id, attempts, "enrollment recompute gave up");
        Err(LedgerError::RetriesExhausted { key, attempts })
    }
}

/// Next enrollment state from the current one, the published lesson ids and
/// the learner's completed records in the course.
fn derive(
    current: &Enrollment,
    published: &HashSet<&str>,
    completed: &[ProgressRecord],
    at: DateTime<Utc>,
) -> Enrollment {
    let counted: Vec<&ProgressRecord> = completed
        .iter()
        .filter(|r| r.is_completed && published.contains(r.lesson_id.as_str()))
        .collect();

    let mut next = Enrollment {
        completed_lessons: counted.len() as u32,
        published_lessons: published.len() as u32,
        ..current.clone()
    };

    if next.completed_at.is_none() && next.is_fully_progressed() {
        next.completed_at = Some(at);
    }

    next
}
