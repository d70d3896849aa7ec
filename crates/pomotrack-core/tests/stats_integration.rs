//! Integration tests for session history statistics.
//!
//! Records sessions through the SQLite store and reads them back as
//! summaries, streaks and daily series.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use pomotrack_core::session::NewSession;
use pomotrack_core::stats::{daily_focus, longest_streak, summarize};
use pomotrack_core::{
    CoreError, Database, FocusTimePolicy, Phase, SessionStatus, SessionStore, Tracker,
    ValidationError,
};

fn seed(db: &Database, user: &str, day: u32, hour: u32, phase: Phase, minutes: u32) -> i64 {
    let started_at = Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap();
    db.insert(&NewSession {
        user: user.to_string(),
        session_type: phase,
        duration_min: minutes,
        started_at,
    })
    .unwrap()
    .id
}

#[test]
fn test_summary_from_database() {
    let db = Arc::new(Database::open_memory().unwrap());
    let a = seed(&db, "ada", 1, 9, Phase::Work, 25);
    let b = seed(&db, "ada", 1, 10, Phase::Work, 25);
    let c = seed(&db, "ada", 1, 11, Phase::Break, 5);
    seed(&db, "bob", 1, 9, Phase::Work, 50);

    let tracker = Tracker::with_database(db);
    tracker.end(a, "ada", SessionStatus::Completed, None).unwrap();
    tracker
        .end(b, "ada", SessionStatus::Interrupted, Some("phone"))
        .unwrap();
    tracker.end(c, "ada", SessionStatus::Completed, None).unwrap();

    let s = tracker.stats("ada", None, None).unwrap();
    assert_eq!(s.total_sessions, 3);
    assert_eq!(s.completed_sessions, 2);
    assert_eq!(s.interrupted_sessions, 1);
    assert_eq!(s.aborted_sessions, 0);
    assert_eq!(s.total_focus_time, 55);
    assert!((s.average_session_duration - 55.0 / 3.0).abs() < 1e-9);
    assert_eq!(s.longest_streak, 3);
    assert_eq!(s.focus_time_policy, FocusTimePolicy::All);
}

#[test]
fn test_date_range_filters_inclusively() {
    let db = Arc::new(Database::open_memory().unwrap());
    seed(&db, "ada", 1, 9, Phase::Work, 25);
    seed(&db, "ada", 2, 9, Phase::Work, 25);
    seed(&db, "ada", 3, 9, Phase::Work, 25);
    let tracker = Tracker::with_database(db);

    let start = Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 3, 9, 0, 0).unwrap();
    let listed = tracker.list("ada", Some(start), Some(end)).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].started_at > listed[1].started_at);

    let err = tracker.stats("ada", Some(end), Some(start)).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation(ValidationError::InvalidTimeRange { .. })
    ));
}

#[test]
fn test_streak_and_daily_series() {
    let db = Database::open_memory().unwrap();
    seed(&db, "ada", 3, 9, Phase::Work, 25);
    seed(&db, "ada", 3, 11, Phase::Work, 25);
    seed(&db, "ada", 3, 15, Phase::Work, 25);
    seed(&db, "ada", 4, 9, Phase::Work, 25);

    let records = db.list("ada", None).unwrap();
    assert_eq!(longest_streak(&records), 3);

    let today = Utc.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap().date_naive();
    let series = daily_focus(&records, today, 7);
    assert_eq!(series.len(), 7);
    assert_eq!(series[5].minutes, 75);
    assert_eq!(series[6].minutes, 25);
}

#[test]
fn test_empty_history_is_all_zero() {
    let s = summarize(&[], FocusTimePolicy::WorkOnly);
    assert_eq!(s.total_sessions, 0);
    assert_eq!(s.total_focus_time, 0);
    assert_eq!(s.average_session_duration, 0.0);
    assert_eq!(s.longest_streak, 0);
}
