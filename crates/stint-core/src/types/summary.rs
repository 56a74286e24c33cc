//! Reporting types: per-day activity summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Activity summary for one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    /// Sum of all sample durations observed that day.
    pub tracked_ms: u64,
    pub hours_tracked: f64,
    /// Duration-weighted mean quality of the day's samples; 0 when nothing
    /// was tracked.
    pub focus_score: f64,
    pub sample_count: usize,
    /// Sessions folded into all task aggregates, all time.
    pub total_sessions: u64,
    pub prediction_accuracy_percent: f64,
}
