//! Per-(user, lesson) progress records and the rule for merging reports into them.

mod store;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::Lesson;
use crate::error::LedgerError;
use crate::record::composite_key;
use crate::Record;

pub use store::ProgressStore;

/// What a learner's client reports about one lesson.
///
/// The user id is supplied by the authenticated session, never by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub user_id: String,
    pub lesson_id: String,
    /// Total seconds watched so far.
    pub watch_time: f64,
    /// Playback position in seconds.
    pub last_position: f64,
    pub is_completed: bool,
    /// When the client observed the progress. Server clock when absent.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl ProgressReport {
    pub fn new(user_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            lesson_id: lesson_id.into(),
            watch_time: 0.0,
            last_position: 0.0,
            is_completed: false,
            occurred_at: None,
        }
    }

    pub fn watched(mut self, seconds: f64) -> Self {
        self.watch_time = seconds;
        self
    }

    pub fn at_position(mut self, seconds: f64) -> Self {
        self.last_position = seconds;
        self
    }

    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    /// Reject reports that cannot be clamped into something meaningful.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.user_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("user id is empty".into()));
        }
        if self.lesson_id.trim().is_empty() {
            return Err(LedgerError::InvalidInput("lesson id is empty".into()));
        }
        for (field, value) in [
            ("watch_time", self.watch_time),
            ("last_position", self.last_position),
        ] {
            if !value.is_finite() {
                return Err(LedgerError::InvalidInput(format!(
                    "{field} is not a finite number"
                )));
            }
            if value < 0.0 {
                return Err(LedgerError::InvalidInput(format!(
                    "{field} is negative ({value})"
                )));
            }
        }
        Ok(())
    }
}

/// Durable fact about one learner's engagement with one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "progress_records")]
pub struct ProgressRecord {
    #[record(key)]
    pub user_id: String,
    #[record(key)]
    pub lesson_id: String,
    pub course_id: String,
    pub is_completed: bool,
    /// Seconds watched; never decreases.
    pub watch_time: f64,
    /// Seconds into the lesson, within `[0, lesson.duration]`.
    pub last_position: f64,
    pub started_at: DateTime<Utc>,
    /// Set on the first transition to completed and never cleared.
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn key_for(user_id: &str, lesson_id: &str) -> String {
        composite_key([user_id, lesson_id])
    }

    /// Merge a report into the existing record (if any).
    ///
    /// `watch_time` takes the maximum, completion is sticky, `completed_at`
    /// is only stamped on the false→true transition, and the position is
    /// clamped to the lesson's duration. `now` stands in for a missing
    /// report timestamp.
    pub fn merge(
        existing: Option<&ProgressRecord>,
        report: &ProgressReport,
        lesson: &Lesson,
        now: DateTime<Utc>,
    ) -> ProgressRecord {
        let at = report.occurred_at.unwrap_or(now);
        let last_position = report.last_position.clamp(0.0, f64::from(lesson.duration));

        match existing {
            None => ProgressRecord {
                user_id: report.user_id.clone(),
                lesson_id: lesson.id.clone(),
                course_id: lesson.course_id.clone(),
                is_completed: report.is_completed,
                watch_time: report.watch_time.max(0.0),
                last_position,
                started_at: at,
                completed_at: report.is_completed.then_some(at),
            },
            Some(prev) => {
                let is_completed = prev.is_completed || report.is_completed;
                let completed_at = match prev.completed_at {
                    Some(stamped) => Some(stamped),
                    None if is_completed => Some(at),
                    None => None,
                };
                ProgressRecord {
                    user_id: prev.user_id.clone(),
                    lesson_id: prev.lesson_id.clone(),
                    course_id: prev.course_id.clone(),
                    is_completed,
                    watch_time: prev.watch_time.max(report.watch_time),
                    last_position,
                    started_at: prev.started_at,
                    completed_at,
                }
            }
        }
    }
}
