//! Shared fixtures: a small catalog and a fixed clock.

#![allow(dead_code)]

use std::sync::Once;

use chrono::{DateTime, TimeZone, Utc};
use progress_ledger::{Course, InMemoryCatalog, Lesson, ProgressLedger, ProgressReport};
use tracing_subscriber::EnvFilter;

pub const COURSE: &str = "rust-101";
pub const GATED_COURSE: &str = "async-201";
pub const LESSONS: [&str; 4] = ["l1", "l2", "l3", "l4"];

/// Seconds after a fixed epoch, so timestamps compare deterministically.
pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// `rust-101`: four published 10-minute lessons, no prerequisites.
///
/// `async-201`: `a1` → `a2` → `a3`, each locked behind the previous one.
pub fn catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();

    catalog
        .add_course(Course::new(COURSE, "Intro to Rust").with_lesson_count(4))
        .unwrap();
    for (i, id) in LESSONS.iter().enumerate() {
        catalog
            .add_lesson(Lesson::new(*id, COURSE, i as u32 + 1, 600).titled(format!("Lesson {}", i + 1)))
            .unwrap();
    }

    catalog
        .add_course(Course::new(GATED_COURSE, "Async Rust").with_lesson_count(3))
        .unwrap();
    catalog.add_lesson(Lesson::new("a1", GATED_COURSE, 1, 300)).unwrap();
    catalog
        .add_lesson(Lesson::new("a2", GATED_COURSE, 2, 300).locked_behind("a1"))
        .unwrap();
    catalog
        .add_lesson(Lesson::new("a3", GATED_COURSE, 3, 300).locked_behind("a2"))
        .unwrap();

    catalog
}

/// Route ledger logs to the test harness; `RUST_LOG=progress_ledger=debug` to see them.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn ledger() -> ProgressLedger<InMemoryCatalog> {
    init_tracing();
    ProgressLedger::in_memory(catalog())
}

/// A completion report stamped at `t(at)`.
pub fn complete(user_id: &str, lesson_id: &str, at: i64) -> ProgressReport {
    ProgressReport::new(user_id, lesson_id)
        .watched(600.0)
        .at_position(600.0)
        .completed()
        .occurred_at(t(at))
}

/// A partial-watch report stamped at `t(at)`.
pub fn watch(user_id: &str, lesson_id: &str, seconds: f64, at: i64) -> ProgressReport {
    ProgressReport::new(user_id, lesson_id)
        .watched(seconds)
        .at_position(seconds)
        .occurred_at(t(at))
}
