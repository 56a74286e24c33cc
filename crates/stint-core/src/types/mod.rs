//! Core types for stint.

mod aggregate;
mod category;
mod conservativity;
mod prediction;
mod sample;
mod settings;
mod summary;

pub use aggregate::TaskAggregate;
pub use category::{Category, CategoryRule, CategoryRules};
pub use conservativity::Conservativity;
pub use prediction::{
    AccuracyReport, ConfidenceLabel, MatchBasis, PredictionRecord, PredictionRequest,
    PredictionResult,
};
pub use sample::{
    CompletedActivity, DurationSample, SampleQuery, MAX_DURATION_MS, MAX_QUALITY_SCORE,
    MIN_QUALITY_SCORE,
};
pub(crate) use sample::{validate_duration, validate_key, validate_quality};
pub use settings::{Settings, SettingsUpdate};
pub use summary::DailySummary;
