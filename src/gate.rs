//! Consistency gate: may this learner complete this lesson yet?

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogError, Lesson, LessonCatalog};
use crate::error::LedgerError;
use crate::progress::ProgressStore;
use crate::record::RecordStore;

/// Why a completion was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    /// `lesson_id` is locked until `prerequisite_id` is completed.
    PrerequisiteIncomplete {
        lesson_id: String,
        prerequisite_id: String,
    },
    /// The prerequisite chain loops back on itself.
    PrerequisiteCycle { lesson_id: String },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::PrerequisiteIncomplete {
                lesson_id,
                prerequisite_id,
            } => write!(
                f,
                "lesson {} requires {} to be completed first",
                lesson_id, prerequisite_id
            ),
            DenyReason::PrerequisiteCycle { lesson_id } => {
                write!(f, "prerequisite chain of lesson {} is cyclic", lesson_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateDecision {
    Allow,
    Deny(DenyReason),
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }
}

/// Applies the locked-lesson rule.
///
/// A lesson that is not locked, or has no prerequisite, is always allowed.
/// Otherwise its prerequisite must be completed, and the rule is applied
/// again to that prerequisite, up the chain.
pub struct ConsistencyGate<'a, C, S> {
    catalog: &'a C,
    progress: ProgressStore<'a, S>,
}

impl<'a, C: LessonCatalog, S: RecordStore> ConsistencyGate<'a, C, S> {
    pub fn new(catalog: &'a C, store: &'a S) -> Self {
        Self {
            catalog,
            progress: ProgressStore::new(store),
        }
    }

    pub fn can_complete(&self, user_id: &str, lesson: &Lesson) -> Result<GateDecision, LedgerError> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(lesson.id.clone());

        let mut current = lesson.clone();
        while current.is_gated() {
            let Some(prerequisite_id) = current.prerequisite_id.clone() else {
                break;
            };

            let satisfied = self
                .progress
                .get_record(user_id, &prerequisite_id)?
                .is_some_and(|r| r.is_completed);
            if !satisfied {
                return Ok(GateDecision::Deny(DenyReason::PrerequisiteIncomplete {
                    lesson_id: current.id,
                    prerequisite_id,
                }));
            }

            if !visited.insert(prerequisite_id.clone()) {
                return Ok(GateDecision::Deny(DenyReason::PrerequisiteCycle {
                    lesson_id: lesson.id.clone(),
                }));
            }

            current = match self.catalog.lesson(&prerequisite_id) {
                Ok(next) => next,
                // Completed prerequisite that has since left the catalog: nothing further to check.
                Err(CatalogError::LessonNotFound(_)) => break,
                Err(err) => return Err(err.into()),
            };
        }

        Ok(GateDecision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Course, InMemoryCatalog};
    use crate::progress::ProgressReport;
    use crate::record::InMemoryRecordStore;
    use chrono::Utc;

    fn setup() -> (InMemoryCatalog, InMemoryRecordStore) {
        let catalog = InMemoryCatalog::new();
        catalog.add_course(Course::new("c1", "Course")).unwrap();
        catalog.add_lesson(Lesson::new("a", "c1", 1, 60)).unwrap();
        catalog
            .add_lesson(Lesson::new("b", "c1", 2, 60).locked_behind("a"))
            .unwrap();
        catalog
            .add_lesson(Lesson::new("c", "c1", 3, 60).locked_behind("b"))
            .unwrap();
        (catalog, InMemoryRecordStore::new())
    }

    fn complete(catalog: &InMemoryCatalog, store: &InMemoryRecordStore, lesson_id: &str) {
        let lesson = catalog.lesson(lesson_id).unwrap();
        ProgressStore::new(store)
            .upsert(&ProgressReport::new("u1", lesson_id).completed(), &lesson, Utc::now())
            .unwrap();
    }

    #[test]
    fn ungated_lesson_is_allowed() {
        let (catalog, store) = setup();
        let gate = ConsistencyGate::new(&catalog, &store);
        let a = catalog.lesson("a").unwrap();
        assert_eq!(gate.can_complete("u1", &a).unwrap(), GateDecision::Allow);
    }

    #[test]
    fn unlocked_lesson_with_prerequisite_is_allowed() {
        let (catalog, store) = setup();
        catalog.set_prerequisite("b", Some("a"), false).unwrap();
        let gate = ConsistencyGate::new(&catalog, &store);
        let b = catalog.lesson("b").unwrap();
        assert!(gate.can_complete("u1", &b).unwrap().is_allowed());
    }

    #[test]
    fn locked_lesson_waits_for_prerequisite() {
        let (catalog, store) = setup();
        let gate = ConsistencyGate::new(&catalog, &store);
        let b = catalog.lesson("b").unwrap();

        assert_eq!(
            gate.can_complete("u1", &b).unwrap(),
            GateDecision::Deny(DenyReason::PrerequisiteIncomplete {
                lesson_id: "b".into(),
                prerequisite_id: "a".into(),
            })
        );

        complete(&catalog, &store, "a");
        assert!(gate.can_complete("u1", &b).unwrap().is_allowed());
        // Another learner's progress does not count.
        assert!(!gate.can_complete("u2", &b).unwrap().is_allowed());
    }

    #[test]
    fn chain_is_checked_transitively() {
        let (catalog, store) = setup();
        // b completed directly in storage while a never was.
        complete(&catalog, &store, "b");

        let gate = ConsistencyGate::new(&catalog, &store);
        let c = catalog.lesson("c").unwrap();
        assert_eq!(
            gate.can_complete("u1", &c).unwrap(),
            GateDecision::Deny(DenyReason::PrerequisiteIncomplete {
                lesson_id: "b".into(),
                prerequisite_id: "a".into(),
            })
        );

        complete(&catalog, &store, "a");
        assert!(gate.can_complete("u1", &c).unwrap().is_allowed());
    }

    #[test]
    fn cyclic_chain_is_denied_not_looped() {
        struct CyclicCatalog;

        impl LessonCatalog for CyclicCatalog {
            fn course(&self, course_id: &str) -> Result<Course, CatalogError> {
                Ok(Course::new(course_id, "cyclic"))
            }
            fn course_lessons(&self, _: &str) -> Result<Vec<Lesson>, CatalogError> {
                Ok(vec![])
            }
            fn lesson(&self, lesson_id: &str) -> Result<Lesson, CatalogError> {
                let other = if lesson_id == "x" { "y" } else { "x" };
                Ok(Lesson::new(lesson_id, "c1", 1, 60).locked_behind(other))
            }
        }

        let store = InMemoryRecordStore::new();
        let progress = ProgressStore::new(&store);
        for id in ["x", "y"] {
            let lesson = CyclicCatalog.lesson(id).unwrap();
            progress
                .upsert(&ProgressReport::new("u1", id).completed(), &lesson, Utc::now())
                .unwrap();
        }

        let gate = ConsistencyGate::new(&CyclicCatalog, &store);
        let x = CyclicCatalog.lesson("x").unwrap();
        assert!(matches!(
            gate.can_complete("u1", &x).unwrap(),
            GateDecision::Deny(DenyReason::PrerequisiteCycle { .. })
        ));
    }
}
