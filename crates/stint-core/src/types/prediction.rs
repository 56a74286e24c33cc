//! Prediction requests, results and persisted prediction records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::conservativity::Conservativity;
use super::sample::validate_key;
use crate::error::StintResult;

/// Request for a duration estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Category used when no exact task history exists.
    pub category: String,
    /// Precise task name (for example a calendar event summary).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_identifier: Option<String>,
    /// Overrides the process-wide setting for this request only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservativity: Option<Conservativity>,
}

impl PredictionRequest {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            task_identifier: None,
            conservativity: None,
        }
    }

    pub fn with_task(mut self, task_identifier: impl Into<String>) -> Self {
        self.task_identifier = Some(task_identifier.into());
        self
    }

    pub fn with_conservativity(mut self, conservativity: Conservativity) -> Self {
        self.conservativity = Some(conservativity);
        self
    }

    pub fn validate(&self) -> StintResult<()> {
        validate_key("category", &self.category)?;
        if let Some(task) = &self.task_identifier {
            validate_key("task_identifier", task)?;
        }
        Ok(())
    }
}

/// Coarse confidence bucket derived from the confidence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ConfidenceLabel {
    Low,
    Medium,
    High,
}

impl ConfidenceLabel {
    /// `< 30` is low, `< 70` is medium, anything else is high.
    pub fn from_percent(percent: u8) -> Self {
        if percent < 30 {
            ConfidenceLabel::Low
        } else if percent < 70 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::High
        }
    }
}

/// Which history a prediction was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchBasis {
    /// Samples recorded under the exact task identifier.
    ExactTask,
    /// Samples of the requested category.
    Category,
    /// No eligible samples; the default estimate was used.
    ColdStart,
}

/// Outcome of [`PredictionEngine::predict`](crate::prediction::PredictionEngine::predict).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_identifier: Option<String>,
    pub predicted_ms: u64,
    pub confidence_percent: u8,
    pub confidence_label: ConfidenceLabel,
    pub sample_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p90_ms: Option<u64>,
    pub conservativity: Conservativity,
    pub basis: MatchBasis,
    pub explanation: String,
}

impl PredictionResult {
    pub fn is_cold_start(&self) -> bool {
        self.basis == MatchBasis::ColdStart
    }
}

/// A persisted prediction awaiting (or holding) its observed outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub category: String,
    pub predicted_ms: u64,
    /// `None` until reconciled; set exactly once.
    pub actual_ms: Option<u64>,
    pub conservativity: Conservativity,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reconciled_at: Option<DateTime<Utc>>,
}

impl PredictionRecord {
    pub fn new(category: impl Into<String>, predicted_ms: u64, conservativity: Conservativity) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            predicted_ms,
            actual_ms: None,
            conservativity,
            created_at: Utc::now(),
            reconciled_at: None,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.actual_ms.is_some()
    }

    /// Absolute percentage error as a fraction, when the outcome is known and
    /// positive.
    pub fn absolute_percentage_error(&self) -> Option<f64> {
        match self.actual_ms {
            Some(actual) if actual > 0 => {
                Some((self.predicted_ms as f64 - actual as f64).abs() / actual as f64)
            }
            _ => None,
        }
    }
}

/// Accuracy over a set of reconciled predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// `max(0, (1 - MAPE) * 100)`, one decimal.
    pub accuracy_percent: f64,
    /// `None` when there is no evidence yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_absolute_percentage_error: Option<f64>,
    /// Records that contributed to the metric.
    pub reconciled_count: usize,
}
