//! Duration samples and the activity input that produces them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::category::CategoryRules;
use crate::error::{StintError, StintResult};

/// Lowest accepted quality score.
pub const MIN_QUALITY_SCORE: f64 = 0.0;
/// Highest accepted quality score.
pub const MAX_QUALITY_SCORE: f64 = 100.0;
/// Longest accepted duration; the largest value SQLite stores as an integer.
pub const MAX_DURATION_MS: u64 = i64::MAX as u64;

/// One observed, completed task or session.
///
/// Samples are immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationSample {
    /// Task name, or the domain/category when no task name was given.
    pub task_identifier: String,
    pub category: String,
    pub duration_ms: u64,
    /// Focus/quality score in `[0, 100]`.
    pub quality_score: f64,
    pub observed_at: DateTime<Utc>,
}

impl DurationSample {
    pub fn new(
        task_identifier: impl Into<String>,
        category: impl Into<String>,
        duration_ms: u64,
        quality_score: f64,
    ) -> Self {
        Self {
            task_identifier: task_identifier.into(),
            category: category.into(),
            duration_ms,
            quality_score,
            observed_at: Utc::now(),
        }
    }

    /// Override the observation time.
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    /// Check identifier, category and score bounds.
    pub fn validate(&self) -> StintResult<()> {
        validate_key("task_identifier", &self.task_identifier)?;
        validate_key("category", &self.category)?;
        validate_duration(self.duration_ms)?;
        validate_quality(self.quality_score)
    }
}

/// Filter for [`SampleStore::query_samples`](crate::traits::SampleStore::query_samples).
///
/// Both fields are exact matches; an empty query selects every sample.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl SampleQuery {
    /// Samples recorded under exactly this task identifier.
    pub fn task(task_identifier: impl Into<String>) -> Self {
        Self {
            task_identifier: Some(task_identifier.into()),
            category: None,
        }
    }

    /// Samples recorded under exactly this category.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            task_identifier: None,
            category: Some(category.into()),
        }
    }

    pub fn matches(&self, sample: &DurationSample) -> bool {
        self.task_identifier
            .as_deref()
            .map_or(true, |t| t == sample.task_identifier)
            && self
                .category
                .as_deref()
                .map_or(true, |c| c == sample.category)
    }
}

/// A finished activity reported by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedActivity {
    pub identifier: String,
    pub category: String,
    pub duration_ms: u64,
    pub quality_score: f64,
    /// Defaults to the time the activity is recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl CompletedActivity {
    pub fn new(
        identifier: impl Into<String>,
        category: impl Into<String>,
        duration_ms: u64,
        quality_score: f64,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            category: category.into(),
            duration_ms,
            quality_score,
            observed_at: None,
        }
    }

    /// Build an activity whose category is derived from free text (a domain or
    /// a window title) through the given rule table.
    pub fn classified(
        identifier: impl Into<String>,
        source_text: &str,
        rules: &CategoryRules,
        duration_ms: u64,
        quality_score: f64,
    ) -> Self {
        Self::new(
            identifier,
            rules.classify(source_text).as_str(),
            duration_ms,
            quality_score,
        )
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }

    /// Convert into an immutable sample, validating the input.
    pub fn into_sample(self) -> StintResult<DurationSample> {
        let sample = DurationSample {
            task_identifier: self.identifier.trim().to_string(),
            category: self.category.trim().to_string(),
            duration_ms: self.duration_ms,
            quality_score: self.quality_score,
            observed_at: self.observed_at.unwrap_or_else(Utc::now),
        };
        sample.validate()?;
        Ok(sample)
    }
}

pub(crate) fn validate_key(field: &str, value: &str) -> StintResult<()> {
    if value.trim().is_empty() {
        return Err(StintError::missing_field(field));
    }
    Ok(())
}

pub(crate) fn validate_duration(duration_ms: u64) -> StintResult<()> {
    if duration_ms > MAX_DURATION_MS {
        return Err(StintError::out_of_range(
            "duration_ms",
            duration_ms as f64,
            0.0,
            MAX_DURATION_MS as f64,
        ));
    }
    Ok(())
}

pub(crate) fn validate_quality(score: f64) -> StintResult<()> {
    if !score.is_finite() || !(MIN_QUALITY_SCORE..=MAX_QUALITY_SCORE).contains(&score) {
        return Err(StintError::out_of_range(
            "quality_score",
            score,
            MIN_QUALITY_SCORE,
            MAX_QUALITY_SCORE,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_query_matching() {
        let sample = DurationSample::new("code-review", "coding", 1000, 50.0);

        assert!(SampleQuery::default().matches(&sample));
        assert!(SampleQuery::task("code-review").matches(&sample));
        assert!(!SampleQuery::task("Code-Review").matches(&sample));
        assert!(SampleQuery::category("coding").matches(&sample));
        assert!(!SampleQuery::category("writing").matches(&sample));
    }

    #[test]
    fn test_activity_into_sample_trims() {
        let sample = CompletedActivity::new("  standup ", " writing", 60_000, 70.0)
            .into_sample()
            .unwrap();
        assert_eq!(sample.task_identifier, "standup");
        assert_eq!(sample.category, "writing");
    }

    #[test]
    fn test_activity_rejects_bad_input() {
        let err = CompletedActivity::new("", "coding", 1, 50.0)
            .into_sample()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);

        let err = CompletedActivity::new("task", "coding", 1, 100.5)
            .into_sample()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValOutOfRange);

        assert!(CompletedActivity::new("task", "coding", 1, f64::NAN)
            .into_sample()
            .is_err());
    }

    #[test]
    fn test_activity_rejects_oversized_duration() {
        let err = CompletedActivity::new("task", "coding", u64::MAX, 50.0)
            .into_sample()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValOutOfRange);

        assert!(CompletedActivity::new("task", "coding", MAX_DURATION_MS, 50.0)
            .into_sample()
            .is_ok());
    }

    #[test]
    fn test_classified_activity() {
        let activity = CompletedActivity::classified(
            "fix flaky test",
            "github.com",
            &CategoryRules::default(),
            90_000,
            80.0,
        );
        assert_eq!(activity.category, "coding");
    }

    #[test]
    fn test_zero_duration_is_valid() {
        assert!(CompletedActivity::new("task", "coding", 0, 0.0)
            .into_sample()
            .is_ok());
    }
}
