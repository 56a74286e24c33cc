//! Integration tests for the tracker over a file-backed SQLite store.
//!
//! Covers the record -> predict -> reconcile cycle end to end.

use stint_core::{
    CompletedActivity, ConfidenceLabel, Conservativity, ErrorCode, MatchBasis, PredictionRequest,
    SettingsUpdate, Tracker, TrackerConfig,
};
use tempfile::TempDir;

const MINUTE: u64 = 60_000;

fn open_tracker(dir: &TempDir) -> Tracker {
    let config = TrackerConfig::builder()
        .db_path(dir.path().join("data").join("stint.db"))
        .build();
    Tracker::open(config).unwrap()
}

fn record_minutes(tracker: &Tracker, task: &str, category: &str, minutes: &[u64]) {
    for m in minutes {
        tracker
            .record_activity(CompletedActivity::new(task, category, m * MINUTE, 60.0))
            .unwrap();
    }
}

/// Test the full cycle: history, prediction, outcome, accuracy.
#[test]
fn test_predict_record_reconcile_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open_tracker(&dir);

    // Cold start before any history exists
    let cold = tracker.predict(&PredictionRequest::new("coding")).unwrap();
    assert_eq!(cold.basis, MatchBasis::ColdStart);
    assert_eq!(cold.predicted_ms, 1_800_000);
    assert_eq!(cold.confidence_percent, 0);
    assert_eq!(cold.confidence_label, ConfidenceLabel::Low);

    record_minutes(&tracker, "refactor", "coding", &[20, 30, 30, 40, 50]);

    let prediction = tracker
        .predict(&PredictionRequest::new("coding").with_task("refactor"))
        .unwrap();
    assert_eq!(prediction.basis, MatchBasis::ExactTask);
    assert_eq!(prediction.predicted_ms, 38 * MINUTE);
    assert_eq!(prediction.confidence_percent, 40);

    let id = tracker.record_prediction(&prediction).unwrap();
    assert_eq!(tracker.accuracy(None).unwrap(), 0.0);

    let record = tracker.record_outcome(id, 38 * MINUTE).unwrap();
    assert_eq!(record.actual_ms, Some(38 * MINUTE));
    assert_eq!(tracker.accuracy(None).unwrap(), 100.0);
    assert_eq!(tracker.accuracy(Some("coding")).unwrap(), 100.0);

    // A second outcome is rejected and the first one is kept
    let err = tracker.record_outcome(id, 10 * MINUTE).unwrap_err();
    assert_eq!(err.code(), ErrorCode::RecAlreadyReconciled);
    assert_eq!(tracker.accuracy(None).unwrap(), 100.0);

    let report = tracker.accuracy_report(None).unwrap();
    assert_eq!(report.reconciled_count, 1);
    assert_eq!(report.mean_absolute_percentage_error, Some(0.0));
}

/// Test that an unknown task falls back to its category.
#[test]
fn test_category_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open_tracker(&dir);
    record_minutes(&tracker, "essay", "writing", &[30, 60]);

    let prediction = tracker
        .predict(&PredictionRequest::new("writing").with_task("blog post"))
        .unwrap();
    assert_eq!(prediction.basis, MatchBasis::Category);
    assert_eq!(prediction.sample_count, 2);
    assert!(prediction.explanation.contains("sessions in 'writing'"));

    // Other categories remain cold
    let research = tracker.predict(&PredictionRequest::new("research")).unwrap();
    assert!(research.is_cold_start());
}

/// Test that data and settings survive reopening the database.
#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let tracker = open_tracker(&dir);
        record_minutes(&tracker, "review", "coding", &[10, 20]);
        tracker
            .update_settings(SettingsUpdate::conservativity(Conservativity::CONSERVATIVE))
            .unwrap();
        let prediction = tracker.predict(&PredictionRequest::new("coding")).unwrap();
        tracker.record_prediction(&prediction).unwrap()
    };

    let tracker = open_tracker(&dir);
    let settings = tracker.settings().unwrap();
    assert_eq!(settings.conservativity, Conservativity::CONSERVATIVE);
    assert!(!settings.tracked_sites.is_empty());

    let aggregate = tracker.aggregate("review").unwrap().unwrap();
    assert_eq!(aggregate.sample_count, 2);
    assert_eq!(aggregate.total_duration_ms, 30 * MINUTE);

    // p90 of [10, 20] minutes is 19 minutes; fully conservative uses it.
    let prediction = tracker.predict(&PredictionRequest::new("coding")).unwrap();
    assert_eq!(prediction.predicted_ms, 19 * MINUTE);

    assert!(tracker.record_outcome(id, 19 * MINUTE).is_ok());
}

/// Test that activities classified from free text land in the right category.
#[test]
fn test_classified_activities() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = open_tracker(&dir);

    let activity = CompletedActivity::classified(
        "reading papers",
        "https://arxiv.org/abs/2401.00001",
        tracker.categories(),
        45 * MINUTE,
        90.0,
    );
    let aggregate = tracker.record_activity(activity).unwrap();
    assert_eq!(aggregate.category, "research");

    let stats = tracker.category_stats("research").unwrap().unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.max_ms, 45 * MINUTE);
}

/// Test that concurrent writers through a shared tracker lose no samples.
#[test]
fn test_concurrent_activity_recording() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = std::sync::Arc::new(open_tracker(&dir));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tracker = tracker.clone();
            std::thread::spawn(move || record_minutes(&tracker, "shared", "coding", &[1; 10]))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let aggregate = tracker.aggregate("shared").unwrap().unwrap();
    assert_eq!(aggregate.sample_count, 40);
    assert_eq!(aggregate.total_duration_ms, 40 * MINUTE);
    assert!((aggregate.running_weighted_quality - 60.0).abs() < 1e-9);
}
