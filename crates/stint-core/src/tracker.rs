//! Caller-facing facade wiring the engine, updater and accuracy tracker to
//! their stores.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::accuracy::AccuracyTracker;
use crate::aggregate::AggregateUpdater;
use crate::config::TrackerConfig;
use crate::error::{StintError, StintResult};
use crate::estimator::DurationStats;
use crate::prediction::PredictionEngine;
use crate::store::{MemoryStore, SqliteStore};
use crate::traits::{AggregateStore, PredictionStore, SampleStore, SettingsProvider, SettingsStore};
use crate::types::{
    validate_key, AccuracyReport, Category, CategoryRules, CompletedActivity, DailySummary,
    PredictionRecord, PredictionRequest, PredictionResult, SampleQuery, Settings, SettingsUpdate,
    TaskAggregate,
};

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Time tracking and duration prediction.
///
/// # Example
///
/// ```ignore
/// use stint_core::{CompletedActivity, PredictionRequest, Tracker, TrackerConfig};
///
/// let tracker = Tracker::open(TrackerConfig::from_env())?;
/// tracker.record_activity(CompletedActivity::new("code review", "coding", 1_500_000, 82.0))?;
///
/// let prediction = tracker.predict(&PredictionRequest::new("coding").with_task("code review"))?;
/// let id = tracker.record_prediction(&prediction)?;
///
/// // ...once the task is done
/// tracker.record_outcome(id, 1_620_000)?;
/// ```
pub struct Tracker {
    config: TrackerConfig,
    samples: Arc<dyn SampleStore>,
    settings: Arc<dyn SettingsStore>,
    engine: PredictionEngine,
    aggregates: AggregateUpdater,
    accuracy: AccuracyTracker,
}

impl Tracker {
    /// Build a tracker over caller-provided stores.
    pub fn new<S>(
        config: TrackerConfig,
        samples: Arc<dyn SampleStore>,
        aggregates: Arc<dyn AggregateStore>,
        predictions: Arc<dyn PredictionStore>,
        settings: Arc<S>,
    ) -> StintResult<Self>
    where
        S: SettingsStore + 'static,
    {
        config.validate()?;

        let provider: Arc<dyn SettingsProvider> = settings.clone();
        let engine =
            PredictionEngine::with_config(config.prediction.clone(), Arc::clone(&samples), provider);

        Ok(Self {
            engine,
            aggregates: AggregateUpdater::new(aggregates),
            accuracy: AccuracyTracker::new(predictions),
            samples,
            settings,
            config,
        })
    }

    /// Tracker over a fresh [`MemoryStore`].
    pub fn in_memory(config: TrackerConfig) -> StintResult<Self> {
        debug!("Creating in-memory tracker");
        let store = Arc::new(MemoryStore::with_settings(Self::seed(&config)));
        Self::new(config, store.clone(), store.clone(), store.clone(), store)
    }

    /// Tracker over the SQLite database at `config.db_path`.
    ///
    /// Settings are seeded from the configuration the first time the database
    /// is created; afterwards the stored settings win.
    pub fn open(config: TrackerConfig) -> StintResult<Self> {
        let store = Arc::new(SqliteStore::new(&config.db_path)?);
        if store.seed_settings(&Self::seed(&config))? {
            info!(path = %config.db_path.display(), "Seeded default settings");
        }
        Self::new(config, store.clone(), store.clone(), store.clone(), store)
    }

    fn seed(config: &TrackerConfig) -> Settings {
        Settings {
            conservativity: config.default_conservativity,
            tracked_sites: config.categories.tracked_sites(),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    // =========================================================================
    // Prediction
    // =========================================================================

    /// Estimate the duration of a task or category.
    pub fn predict(&self, request: &PredictionRequest) -> StintResult<PredictionResult> {
        self.engine.predict(request)
    }

    /// Keep a prediction so it can be scored once the real duration is known.
    pub fn record_prediction(&self, prediction: &PredictionResult) -> StintResult<Uuid> {
        self.accuracy.record(
            &prediction.category,
            prediction.predicted_ms,
            prediction.conservativity,
        )
    }

    /// Reconcile a recorded prediction with the observed duration.
    pub fn record_outcome(&self, record_id: Uuid, actual_ms: u64) -> StintResult<PredictionRecord> {
        self.accuracy.reconcile(record_id, actual_ms)
    }

    pub fn accuracy(&self, category: Option<&str>) -> StintResult<f64> {
        self.accuracy.accuracy(category)
    }

    pub fn accuracy_report(&self, category: Option<&str>) -> StintResult<AccuracyReport> {
        self.accuracy.report(category)
    }

    // =========================================================================
    // Activity
    // =========================================================================

    /// Store a finished activity and fold it into its task aggregate.
    ///
    /// If the aggregate cannot be updated the sample is withdrawn again, so
    /// predictions never see a sample the aggregate does not count.
    pub fn record_activity(&self, activity: CompletedActivity) -> StintResult<TaskAggregate> {
        let sample = activity.into_sample()?;
        self.samples.append(&sample)?;
        let aggregate = match self.aggregates.apply_sample(
            &sample.task_identifier,
            &sample.category,
            sample.duration_ms,
            sample.quality_score,
        ) {
            Ok(aggregate) => aggregate,
            Err(e) => {
                // The sample must not outlive an aggregate that never counted it.
                if let Err(undo) = self.samples.remove(&sample) {
                    warn!(
                        task = %sample.task_identifier,
                        error = %undo,
                        "Failed to withdraw sample after aggregate update failed"
                    );
                }
                return Err(e);
            }
        };

        info!(
            task = %sample.task_identifier,
            category = %sample.category,
            duration_ms = sample.duration_ms,
            "Recorded activity"
        );
        Ok(aggregate)
    }

    pub fn aggregate(&self, identifier: &str) -> StintResult<Option<TaskAggregate>> {
        self.aggregates.aggregate(identifier)
    }

    pub fn aggregates(&self, category: Option<&str>) -> StintResult<Vec<TaskAggregate>> {
        self.aggregates.aggregates(category)
    }

    /// Drop a task aggregate. Recorded samples are kept.
    pub fn reset_aggregate(&self, identifier: &str) -> StintResult<bool> {
        self.aggregates.reset(identifier)
    }

    // =========================================================================
    // Reporting
    // =========================================================================

    /// Descriptive statistics over the positive durations of a category.
    pub fn category_stats(&self, category: &str) -> StintResult<Option<DurationStats>> {
        validate_key("category", category)?;
        let durations: Vec<u64> = self
            .samples
            .query_samples(&SampleQuery::category(category.trim()))?
            .into_iter()
            .map(|s| s.duration_ms)
            .filter(|&d| d > 0)
            .collect();
        Ok(DurationStats::from_durations(&durations))
    }

    /// Summary of the samples observed on one UTC calendar day.
    pub fn daily_summary(&self, date: NaiveDate) -> StintResult<DailySummary> {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);
        let samples = self.samples.samples_between(start, end)?;

        let tracked_ms = samples
            .iter()
            .try_fold(0u64, |total, s| total.checked_add(s.duration_ms))
            .ok_or_else(|| {
                StintError::validation(format!(
                    "tracked time on {} exceeds u64 milliseconds",
                    date
                ))
            })?;
        let focus_score = if tracked_ms > 0 {
            samples
                .iter()
                .map(|s| s.quality_score * s.duration_ms as f64)
                .sum::<f64>()
                / tracked_ms as f64
        } else {
            0.0
        };

        Ok(DailySummary {
            date,
            tracked_ms,
            hours_tracked: round2(tracked_ms as f64 / MS_PER_HOUR),
            focus_score: round2(focus_score),
            sample_count: samples.len(),
            total_sessions: self.aggregates.total_sessions()?,
            prediction_accuracy_percent: self.accuracy.accuracy(None)?,
        })
    }

    // =========================================================================
    // Classification and settings
    // =========================================================================

    /// Map a domain, window title or task name onto a category.
    pub fn classify(&self, text: &str) -> Category {
        self.config.categories.classify(text)
    }

    pub fn categories(&self) -> &CategoryRules {
        &self.config.categories
    }

    pub fn settings(&self) -> StintResult<Settings> {
        self.settings.settings()
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> StintResult<Settings> {
        let settings = self.settings.update_settings(update)?;
        info!(
            conservativity = settings.conservativity.value(),
            tracked_sites = settings.tracked_sites.len(),
            "Updated settings"
        );
        Ok(settings)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
