use std::collections::{HashMap, HashSet};

use super::{CatalogError, Lesson};

/// Check the prerequisite links among one course's lessons.
///
/// Every `prerequisite_id` must name a different lesson of the same course,
/// and following prerequisite links must never revisit a lesson. Each lesson
/// has at most one prerequisite, so walking each chain once with a memo of
/// already-verified lessons is linear in the number of lessons.
pub fn validate_prerequisites(lessons: &[Lesson]) -> Result<(), CatalogError> {
    let by_id: HashMap<&str, &Lesson> = lessons.iter().map(|l| (l.id.as_str(), l)).collect();

    for lesson in lessons {
        let Some(prereq) = lesson.prerequisite_id.as_deref() else {
            continue;
        };
        if prereq == lesson.id {
            return Err(CatalogError::Invalid(format!(
                "lesson {} lists itself as prerequisite",
                lesson.id
            )));
        }
        match by_id.get(prereq) {
            Some(target) if target.course_id == lesson.course_id => {}
            Some(target) => {
                return Err(CatalogError::Invalid(format!(
                    "lesson {} (course {}) has prerequisite {} from course {}",
                    lesson.id, lesson.course_id, prereq, target.course_id
                )))
            }
            None => {
                return Err(CatalogError::Invalid(format!(
                    "lesson {} has unknown prerequisite {}",
                    lesson.id, prereq
                )))
            }
        }
    }

    let mut acyclic: HashSet<&str> = HashSet::new();
    for lesson in lessons {
        let mut path: Vec<&str> = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut current = Some(lesson.id.as_str());

        while let Some(id) = current {
            if acyclic.contains(id) {
                break;
            }
            if !on_path.insert(id) {
                path.push(id);
                return Err(CatalogError::Invalid(format!(
                    "prerequisite cycle: {}",
                    path.join(" -> ")
                )));
            }
            path.push(id);
            current = by_id.get(id).and_then(|l| l.prerequisite_id.as_deref());
        }

        acyclic.extend(path);
    }

    Ok(())
}
