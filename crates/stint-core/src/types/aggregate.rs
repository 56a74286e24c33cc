//! Running per-task aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sample::{MAX_DURATION_MS, MAX_QUALITY_SCORE, MIN_QUALITY_SCORE};
use crate::error::{StintError, StintResult};

/// Running summary of every sample recorded under one identifier.
///
/// `running_weighted_quality` is the duration-weighted mean quality of all
/// samples folded in so far. It is maintained incrementally by
/// [`TaskAggregate::fold`] and never recomputed from history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAggregate {
    pub identifier: String,
    pub category: String,
    pub total_duration_ms: u64,
    pub sample_count: u64,
    pub running_weighted_quality: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskAggregate {
    /// Aggregate for a first observation.
    pub fn first(
        identifier: impl Into<String>,
        category: impl Into<String>,
        duration_ms: u64,
        quality_score: f64,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            category: category.into(),
            total_duration_ms: duration_ms,
            sample_count: 1,
            running_weighted_quality: quality_score,
            created_at: at,
            updated_at: at,
        }
    }

    /// Fold one more sample into an existing aggregate, or start one.
    ///
    /// With `prev_total` the duration before this sample:
    ///
    /// ```text
    /// quality' = (quality * prev_total + score * duration) / (prev_total + duration)
    /// ```
    ///
    /// When `prev_total` is zero the new score replaces the old one outright,
    /// which keeps a leading zero-duration sample from dividing by zero. The
    /// category recorded on first observation is kept.
    ///
    /// Fails, leaving the aggregate untouched, when the total would exceed
    /// [`MAX_DURATION_MS`].
    pub fn fold(
        previous: Option<TaskAggregate>,
        identifier: &str,
        category: &str,
        duration_ms: u64,
        quality_score: f64,
        at: DateTime<Utc>,
    ) -> StintResult<TaskAggregate> {
        let Some(mut aggregate) = previous else {
            return Ok(Self::first(identifier, category, duration_ms, quality_score, at));
        };

        let prev_total = aggregate.total_duration_ms;
        let total = prev_total
            .checked_add(duration_ms)
            .filter(|&total| total <= MAX_DURATION_MS)
            .ok_or_else(|| {
                StintError::validation(format!(
                    "total duration of '{}' would exceed {} ms",
                    aggregate.identifier, MAX_DURATION_MS
                ))
            })?;

        aggregate.total_duration_ms = total;
        aggregate.sample_count += 1;
        aggregate.running_weighted_quality = if prev_total > 0 {
            ((aggregate.running_weighted_quality * prev_total as f64
                + quality_score * duration_ms as f64)
                / total as f64)
                .clamp(MIN_QUALITY_SCORE, MAX_QUALITY_SCORE)
        } else {
            quality_score
        };
        aggregate.updated_at = at;
        Ok(aggregate)
    }
}
