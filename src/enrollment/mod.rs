//! Enrollments and their derived course progress.

mod aggregator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::composite_key;
use crate::Record;

pub use aggregator::EnrollmentAggregator;

/// A learner's relationship to a course.
///
/// Progress is stored as the exact ratio `completed_lessons /
/// published_lessons` and only rounded when read through
/// [`Enrollment::progress`], so repeated recomputation never drifts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Record)]
#[record(collection = "enrollments")]
pub struct Enrollment {
    #[record(key)]
    pub user_id: String,
    #[record(key)]
    pub course_id: String,
    pub enrolled_at: DateTime<Utc>,
    /// Completed lessons among those currently published.
    pub completed_lessons: u32,
    /// Published lessons at the last recompute.
    pub published_lessons: u32,
    /// Set the first time progress reached 100; never cleared.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(
        user_id: impl Into<String>,
        course_id: impl Into<String>,
        enrolled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            course_id: course_id.into(),
            enrolled_at,
            completed_lessons: 0,
            published_lessons: 0,
            completed_at: None,
        }
    }

    pub fn key_for(user_id: &str, course_id: &str) -> String {
        composite_key([user_id, course_id])
    }

    /// Percent complete, rounded half up to a whole number in 0..=100.
    pub fn progress(&self) -> u8 {
        let denominator = u64::from(self.published_lessons.max(1));
        let numerator = u64::from(self.completed_lessons.min(self.published_lessons));
        ((200 * numerator + denominator) / (2 * denominator)) as u8
    }

    /// Unrounded percentage.
    pub fn progress_exact(&self) -> f64 {
        let denominator = f64::from(self.published_lessons.max(1));
        100.0 * f64::from(self.completed_lessons.min(self.published_lessons)) / denominator
    }

    /// True when every published lesson is completed (and there is at least one).
    pub fn is_fully_progressed(&self) -> bool {
        self.published_lessons > 0 && self.completed_lessons >= self.published_lessons
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Serialized shape handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrollmentView {
    pub user_id: String,
    pub course_id: String,
    pub progress: u8,
    pub completed_lessons: u32,
    pub published_lessons: u32,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Enrollment> for EnrollmentView {
    fn from(e: &Enrollment) -> Self {
        Self {
            user_id: e.user_id.clone(),
            course_id: e.course_id.clone(),
            progress: e.progress(),
            completed_lessons: e.completed_lessons,
            published_lessons: e.published_lessons,
            enrolled_at: e.enrolled_at,
            completed_at: e.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrollment(completed: u32, published: u32) -> Enrollment {
        Enrollment {
            completed_lessons: completed,
            published_lessons: published,
            ..Enrollment::new("u1", "c1", Utc::now())
        }
    }

    #[test]
    fn progress_rounds_to_nearest() {
        assert_eq!(enrollment(0, 4).progress(), 0);
        assert_eq!(enrollment(3, 4).progress(), 75);
        assert_eq!(enrollment(1, 3).progress(), 33);
        assert_eq!(enrollment(2, 3).progress(), 67);
        assert_eq!(enrollment(1, 8).progress(), 13);
        assert_eq!(enrollment(4, 4).progress(), 100);
    }

    #[test]
    fn empty_course_is_zero_not_complete() {
        let e = enrollment(0, 0);
        assert_eq!(e.progress(), 0);
        assert_eq!(e.progress_exact(), 0.0);
        assert!(!e.is_fully_progressed());
    }

    #[test]
    fn exact_progress_keeps_the_ratio() {
        let e = enrollment(1, 3);
        assert!((e.progress_exact() - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn view_serializes_rounded_progress() {
        let view = EnrollmentView::from(&enrollment(3, 4));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["progress"], 75);
        assert_eq!(json["completed_lessons"], 3);
    }

    #[test]
    fn key_matches_key_for() {
        assert_eq!(enrollment(0, 0).key(), Enrollment::key_for("u1", "c1"));
    }
}
