//! Lesson catalog - courses, their ordered lessons, and publish/lock metadata.
//!
//! The ledger only ever reads the catalog through [`LessonCatalog`]. Authoring
//! (creating lessons, toggling publish state, wiring prerequisites) happens
//! elsewhere; [`InMemoryCatalog`] provides a validated authoring surface for
//! embedding and tests.

mod in_memory;
mod prerequisites;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::InMemoryCatalog;
pub use prerequisites::validate_prerequisites;

/// A course: an ordered collection of lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    /// Authored lesson count. Expected to match the published lesson count,
    /// but never trusted by the ledger.
    pub lesson_count: u32,
}

impl Course {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            lesson_count: 0,
        }
    }

    pub fn with_lesson_count(mut self, lesson_count: u32) -> Self {
        self.lesson_count = lesson_count;
        self
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub course_id: String,
    /// Position within the course, 1-based and unique per course.
    pub order: u32,
    pub title: String,
    /// Length in seconds. Playback positions are clamped to this.
    pub duration: u32,
    pub is_published: bool,
    pub is_locked: bool,
    pub prerequisite_id: Option<String>,
}

impl Lesson {
    /// A published, unlocked lesson with no prerequisite.
    pub fn new(
        id: impl Into<String>,
        course_id: impl Into<String>,
        order: u32,
        duration: u32,
    ) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            course_id: course_id.into(),
            order,
            duration,
            is_published: true,
            is_locked: false,
            prerequisite_id: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }

    /// Lock this lesson behind `prerequisite_id`.
    pub fn locked_behind(mut self, prerequisite_id: impl Into<String>) -> Self {
        self.is_locked = true;
        self.prerequisite_id = Some(prerequisite_id.into());
        self
    }

    /// True when completing this lesson requires another lesson first.
    pub fn is_gated(&self) -> bool {
        self.is_locked && self.prerequisite_id.is_some()
    }
}

/// Error type for catalog lookups and authoring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("lesson not found: {0}")]
    LessonNotFound(String),

    /// An authoring change was rejected.
    #[error("invalid catalog change: {0}")]
    Invalid(String),

    #[error("catalog storage error: {0}")]
    Storage(String),
}

/// Read access to courses and lessons.
pub trait LessonCatalog: Send + Sync {
    fn course(&self, course_id: &str) -> Result<Course, CatalogError>;

    /// All lessons of a course ordered by `order`, published or not.
    fn course_lessons(&self, course_id: &str) -> Result<Vec<Lesson>, CatalogError>;

    fn lesson(&self, lesson_id: &str) -> Result<Lesson, CatalogError>;
}

impl<C: LessonCatalog> LessonCatalog for std::sync::Arc<C> {
    fn course(&self, course_id: &str) -> Result<Course, CatalogError> {
        (**self).course(course_id)
    }

    fn course_lessons(&self, course_id: &str) -> Result<Vec<Lesson>, CatalogError> {
        (**self).course_lessons(course_id)
    }

    fn lesson(&self, lesson_id: &str) -> Result<Lesson, CatalogError> {
        (**self).lesson(lesson_id)
    }
}
