//! Property-based tests for report merging and derived course progress.

mod support;

use proptest::prelude::*;

use progress_ledger::{Enrollment, ProgressReport, RecordsExt};
use support::{complete, ledger, t, COURSE, LESSONS};

// =============================================================================
// Strategies
// =============================================================================

/// (watch_time, last_position, is_completed) for one report on a 600s lesson.
fn arb_report() -> impl Strategy<Value = (f64, f64, bool)> {
    (0.0f64..1_000.0, 0.0f64..1_500.0, any::<bool>())
}

/// Some of the course's lessons, in any order.
fn arb_completion_order() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(LESSONS.to_vec(), 0..=LESSONS.len()).prop_shuffle()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn merged_record_matches_report_history(reports in prop::collection::vec(arb_report(), 1..20)) {
        let ledger = ledger();
        ledger.enroll("u1", COURSE).unwrap();

        for (i, (watched, position, completed)) in reports.iter().enumerate() {
            let mut report = ProgressReport::new("u1", "l1")
                .watched(*watched)
                .at_position(*position)
                .occurred_at(t(i as i64));
            if *completed {
                report = report.completed();
            }
            ledger.record_progress(report).unwrap();
        }

        let record = ledger.get_record("u1", "l1").unwrap().unwrap();

        let max_watch = reports.iter().map(|r| r.0).fold(0.0, f64::max);
        prop_assert_eq!(record.watch_time, max_watch);

        let last_position = reports.last().map(|r| r.1.min(600.0)).unwrap();
        prop_assert_eq!(record.last_position, last_position);

        let first_completion = reports.iter().position(|r| r.2);
        prop_assert_eq!(record.is_completed, first_completion.is_some());
        prop_assert_eq!(record.completed_at, first_completion.map(|i| t(i as i64)));
        prop_assert_eq!(record.started_at, t(0));
    }

    #[test]
    fn progress_tracks_completed_lessons(order in arb_completion_order()) {
        let ledger = ledger();
        ledger.enroll("u1", COURSE).unwrap();

        for lesson in &order {
            // Event time follows lesson order, not arrival order.
            let at = LESSONS.iter().position(|l| l == lesson).unwrap() as i64 * 10;
            ledger.record_progress(complete("u1", lesson, at)).unwrap();
        }

        let enrollment = ledger.enrollment("u1", COURSE).unwrap().unwrap();
        let expected = [0u8, 25, 50, 75, 100][order.len()];
        prop_assert_eq!(enrollment.progress(), expected);

        if order.len() == LESSONS.len() {
            // Stamped by whichever report arrived last, not the latest event.
            let last = order.last().unwrap();
            let at = LESSONS.iter().position(|l| l == last).unwrap() as i64 * 10;
            prop_assert_eq!(enrollment.completed_at, Some(t(at)));
        } else {
            prop_assert_eq!(enrollment.completed_at, None);
        }
    }

    #[test]
    fn recompute_never_writes_twice(order in arb_completion_order()) {
        let ledger = ledger();
        ledger.enroll("u1", COURSE).unwrap();
        for (i, lesson) in order.iter().enumerate() {
            ledger.record_progress(complete("u1", lesson, i as i64)).unwrap();
        }

        let key = Enrollment::key_for("u1", COURSE);
        let before = ledger.store().records::<Enrollment>().get(&key).unwrap().unwrap();
        let recomputed = ledger.recompute("u1", COURSE).unwrap();
        let after = ledger.store().records::<Enrollment>().get(&key).unwrap().unwrap();

        prop_assert_eq!(recomputed, before.data);
        prop_assert_eq!(after.version, before.version);
    }

    #[test]
    fn progress_rounds_half_up(completed in 0u32..=50, extra in 0u32..=50) {
        let published = completed + extra;
        let enrollment = Enrollment {
            completed_lessons: completed,
            published_lessons: published,
            ..Enrollment::new("u1", COURSE, t(0))
        };

        let expected = if published == 0 {
            0
        } else {
            (100.0 * f64::from(completed) / f64::from(published) + 0.5).floor() as u8
        };
        prop_assert_eq!(enrollment.progress(), expected);
        prop_assert!(enrollment.progress() <= 100);
    }
}
