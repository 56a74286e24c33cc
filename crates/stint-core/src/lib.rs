//! stint-core - Core library for stint.
//!
//! This crate tracks time spent on tasks and predicts how long similar tasks
//! will take, blending the median and 90th percentile of past durations by a
//! tunable conservativity factor.
//!
//! # Example
//!
//! ```ignore
//! use stint_core::{CompletedActivity, PredictionRequest, Tracker, TrackerConfig};
//!
//! let tracker = Tracker::in_memory(TrackerConfig::default())?;
//!
//! // Record a finished session
//! tracker.record_activity(CompletedActivity::new("standup", "writing", 900_000, 70.0))?;
//!
//! // Ask for an estimate
//! let prediction = tracker.predict(&PredictionRequest::new("writing").with_task("standup"))?;
//! println!("{}", prediction.explanation);
//! ```

pub mod accuracy;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod estimator;
pub mod prediction;
pub mod store;
pub mod tracker;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use accuracy::AccuracyTracker;
pub use aggregate::AggregateUpdater;
pub use config::{PredictionConfig, TrackerConfig};
pub use error::{ErrorCode, StintError, StintResult};
pub use estimator::{median_and_p90, percentile, DurationStats};
pub use prediction::PredictionEngine;
pub use store::{MemoryStore, SqliteStore};
pub use tracker::Tracker;
pub use traits::{
    AggregateStore, PredictionStore, SampleStore, SettingsProvider, SettingsStore, StaticSettings,
};
pub use types::{
    AccuracyReport, Category, CategoryRule, CategoryRules, CompletedActivity, ConfidenceLabel,
    Conservativity, DailySummary, DurationSample, MatchBasis, PredictionRecord, PredictionRequest,
    PredictionResult, SampleQuery, Settings, SettingsUpdate, TaskAggregate,
};
