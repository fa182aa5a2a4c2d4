use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::{validate_prerequisites, CatalogError, Course, Lesson, LessonCatalog};

#[derive(Default)]
struct CatalogState {
    courses: HashMap<String, Course>,
    lessons: HashMap<String, Lesson>,
}

impl CatalogState {
    fn lessons_of(&self, course_id: &str) -> Vec<Lesson> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .values()
            .filter(|l| l.course_id == course_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.order);
        lessons
    }
}

/// Thread-safe in-memory catalog with validated authoring operations.
#[derive(Default)]
pub struct InMemoryCatalog {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, course: Course) -> Result<(), CatalogError> {
        let mut state = self.write()?;
        if state.courses.contains_key(&course.id) {
            return Err(CatalogError::Invalid(format!(
                "course {} already exists",
                course.id
            )));
        }
        debug!(course_id = %course.id, "course added");
        state.courses.insert(course.id.clone(), course);
        Ok(())
    }

    /// Add a lesson, rejecting bad ordering and invalid prerequisite links.
    pub fn add_lesson(&self, lesson: Lesson) -> Result<(), CatalogError> {
        let mut state = self.write()?;

        if !state.courses.contains_key(&lesson.course_id) {
            return Err(CatalogError::CourseNotFound(lesson.course_id.clone()));
        }
        if state.lessons.contains_key(&lesson.id) {
            return Err(CatalogError::Invalid(format!(
                "lesson {} already exists",
                lesson.id
            )));
        }
        if lesson.order == 0 {
            return Err(CatalogError::Invalid(format!(
                "lesson {} has order 0; orders start at 1",
                lesson.id
            )));
        }

        let mut siblings = state.lessons_of(&lesson.course_id);
        if let Some(clash) = siblings.iter().find(|l| l.order == lesson.order) {
            return Err(CatalogError::Invalid(format!(
                "lesson {} reuses order {} of lesson {}",
                lesson.id, lesson.order, clash.id
            )));
        }

        siblings.push(lesson.clone());
        validate_prerequisites(&siblings)?;

        debug!(lesson_id = %lesson.id, course_id = %lesson.course_id, "lesson added");
        state.lessons.insert(lesson.id.clone(), lesson);
        Ok(())
    }

    pub fn set_published(&self, lesson_id: &str, published: bool) -> Result<(), CatalogError> {
        let mut state = self.write()?;
        let lesson = state
            .lessons
            .get_mut(lesson_id)
            .ok_or_else(|| CatalogError::LessonNotFound(lesson_id.to_string()))?;
        lesson.is_published = published;
        Ok(())
    }

    /// Re-point (or clear) a lesson's prerequisite. The change is only
    /// applied if the course's prerequisite graph stays valid.
    pub fn set_prerequisite(
        &self,
        lesson_id: &str,
        prerequisite_id: Option<&str>,
        locked: bool,
    ) -> Result<(), CatalogError> {
        let mut state = self.write()?;
        let mut lesson = state
            .lessons
            .get(lesson_id)
            .cloned()
            .ok_or_else(|| CatalogError::LessonNotFound(lesson_id.to_string()))?;

        lesson.prerequisite_id = prerequisite_id.map(str::to_string);
        lesson.is_locked = locked;

        let mut lessons: Vec<Lesson> = state
            .lessons_of(&lesson.course_id)
            .into_iter()
            .filter(|l| l.id != lesson_id)
            .collect();
        lessons.push(lesson.clone());
        // Cross-course links must fail as "different course", not "unknown".
        if let Some(target) = prerequisite_id.and_then(|id| state.lessons.get(id)) {
            if target.course_id != lesson.course_id {
                lessons.push(target.clone());
            }
        }
        validate_prerequisites(&lessons)?;

        state.lessons.insert(lesson.id.clone(), lesson);
        Ok(())
    }

    /// Set the course's authored `lesson_count` to its published lesson count.
    pub fn sync_lesson_count(&self, course_id: &str) -> Result<u32, CatalogError> {
        let mut state = self.write()?;
        let published = state
            .lessons_of(course_id)
            .iter()
            .filter(|l| l.is_published)
            .count() as u32;
        let course = state
            .courses
            .get_mut(course_id)
            .ok_or_else(|| CatalogError::CourseNotFound(course_id.to_string()))?;
        course.lesson_count = published;
        Ok(published)
    }

    /// Remove a lesson nothing else depends on.
    ///
    /// Callers holding learner progress should first confirm no progress
    /// records reference the lesson (see `ProgressLedger::check_lesson_removal`).
    pub fn remove_lesson(&self, lesson_id: &str) -> Result<Lesson, CatalogError> {
        let mut state = self.write()?;
        if let Some(dependent) = state
            .lessons
            .values()
            .find(|l| l.prerequisite_id.as_deref() == Some(lesson_id))
        {
            return Err(CatalogError::Invalid(format!(
                "lesson {} is the prerequisite of {}",
                lesson_id, dependent.id
            )));
        }
        state
            .lessons
            .remove(lesson_id)
            .ok_or_else(|| CatalogError::LessonNotFound(lesson_id.to_string()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>, CatalogError> {
        self.state
            .read()
            .map_err(|_| CatalogError::Storage("catalog lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>, CatalogError> {
        self.state
            .write()
            .map_err(|_| CatalogError::Storage("catalog lock poisoned".into()))
    }
}

impl LessonCatalog for InMemoryCatalog {
    fn course(&self, course_id: &str) -> Result<Course, CatalogError> {
        self.read()?
            .courses
            .get(course_id)
            .cloned()
            .ok_or_else(|| CatalogError::CourseNotFound(course_id.to_string()))
    }

    fn course_lessons(&self, course_id: &str) -> Result<Vec<Lesson>, CatalogError> {
        let state = self.read()?;
        if !state.courses.contains_key(course_id) {
            return Err(CatalogError::CourseNotFound(course_id.to_string()));
        }
        Ok(state.lessons_of(course_id))
    }

    fn lesson(&self, lesson_id: &str) -> Result<Lesson, CatalogError> {
        self.read()?
            .lessons
            .get(lesson_id)
            .cloned()
            .ok_or_else(|| CatalogError::LessonNotFound(lesson_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> InMemoryCatalog {
        let catalog = InMemoryCatalog::new();
        catalog.add_course(Course::new("rust-101", "Intro to Rust")).unwrap();
        catalog
    }

    #[test]
    fn lessons_come_back_in_order() {
        let catalog = catalog();
        catalog.add_lesson(Lesson::new("l3", "rust-101", 3, 60)).unwrap();
        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();
        catalog.add_lesson(Lesson::new("l2", "rust-101", 2, 60)).unwrap();

        let ids: Vec<_> = catalog
            .course_lessons("rust-101")
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect();
        assert_eq!(ids, ["l1", "l2", "l3"]);
    }

    #[test]
    fn unknown_course_is_not_found() {
        let catalog = catalog();
        assert_eq!(
            catalog.course_lessons("nope").unwrap_err(),
            CatalogError::CourseNotFound("nope".into())
        );
        assert!(matches!(
            catalog.add_lesson(Lesson::new("l1", "nope", 1, 60)),
            Err(CatalogError::CourseNotFound(_))
        ));
    }

    #[test]
    fn order_must_be_positive_and_unique() {
        let catalog = catalog();
        assert!(catalog.add_lesson(Lesson::new("l0", "rust-101", 0, 60)).is_err());

        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();
        let err = catalog
            .add_lesson(Lesson::new("dup", "rust-101", 1, 60))
            .unwrap_err();
        assert!(err.to_string().contains("reuses order 1"));
    }

    #[test]
    fn prerequisite_must_exist_first() {
        let catalog = catalog();
        let err = catalog
            .add_lesson(Lesson::new("l2", "rust-101", 2, 60).locked_behind("l1"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Invalid(_)));
    }

    #[test]
    fn rewiring_into_a_cycle_is_rejected() {
        let catalog = catalog();
        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();
        catalog
            .add_lesson(Lesson::new("l2", "rust-101", 2, 60).locked_behind("l1"))
            .unwrap();

        let err = catalog.set_prerequisite("l1", Some("l2"), true).unwrap_err();
        assert!(err.to_string().contains("cycle"));
        // Rejected change left the lesson untouched.
        assert_eq!(catalog.lesson("l1").unwrap().prerequisite_id, None);
    }

    #[test]
    fn cross_course_prerequisite_is_rejected() {
        let catalog = catalog();
        catalog.add_course(Course::new("go-101", "Intro to Go")).unwrap();
        catalog.add_lesson(Lesson::new("g1", "go-101", 1, 60)).unwrap();
        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();

        let err = catalog.set_prerequisite("l1", Some("g1"), true).unwrap_err();
        assert!(err.to_string().contains("go-101"));
    }

    #[test]
    fn sync_lesson_count_counts_published() {
        let catalog = catalog();
        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();
        catalog
            .add_lesson(Lesson::new("l2", "rust-101", 2, 60).unpublished())
            .unwrap();

        assert_eq!(catalog.sync_lesson_count("rust-101").unwrap(), 1);
        assert_eq!(catalog.course("rust-101").unwrap().lesson_count, 1);

        catalog.set_published("l2", true).unwrap();
        assert_eq!(catalog.sync_lesson_count("rust-101").unwrap(), 2);
    }

    #[test]
    fn prerequisite_targets_cannot_be_removed() {
        let catalog = catalog();
        catalog.add_lesson(Lesson::new("l1", "rust-101", 1, 60)).unwrap();
        catalog
            .add_lesson(Lesson::new("l2", "rust-101", 2, 60).locked_behind("l1"))
            .unwrap();

        assert!(catalog.remove_lesson("l1").is_err());
        catalog.remove_lesson("l2").unwrap();
        catalog.remove_lesson("l1").unwrap();
        assert!(catalog.course_lessons("rust-101").unwrap().is_empty());
    }
}
