use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LESSON_COMPLETED: &str = "LessonCompleted";
pub const COURSE_COMPLETED: &str = "CourseCompleted";

/// Something worth telling the rest of the application after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerNotice {
    LessonCompleted {
        user_id: String,
        course_id: String,
        lesson_id: String,
        completed_at: DateTime<Utc>,
    },
    CourseCompleted {
        user_id: String,
        course_id: String,
        completed_at: DateTime<Utc>,
    },
}

impl LedgerNotice {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerNotice::LessonCompleted { .. } => LESSON_COMPLETED,
            LedgerNotice::CourseCompleted { .. } => COURSE_COMPLETED,
        }
    }

    /// JSON payload delivered to listeners.
    pub fn payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
