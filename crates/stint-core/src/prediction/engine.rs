//! Prediction engine: exact-task lookup, category fallback, cold start.

use std::sync::Arc;

use tracing::debug;

use crate::config::PredictionConfig;
use crate::error::StintResult;
use crate::estimator::median_and_p90;
use crate::traits::{SampleStore, SettingsProvider};
use crate::types::{
    ConfidenceLabel, Conservativity, MatchBasis, PredictionRequest, PredictionResult, SampleQuery,
};

/// Produces duration estimates from the sample store.
///
/// Stateless between calls; every prediction re-reads the history it needs.
pub struct PredictionEngine {
    samples: Arc<dyn SampleStore>,
    settings: Arc<dyn SettingsProvider>,
    config: PredictionConfig,
}

impl PredictionEngine {
    /// Create an engine with default tuning.
    pub fn new(samples: Arc<dyn SampleStore>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self::with_config(PredictionConfig::default(), samples, settings)
    }

    /// Create an engine with custom tuning.
    pub fn with_config(
        config: PredictionConfig,
        samples: Arc<dyn SampleStore>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            samples,
            settings,
            config,
        }
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Estimate how long the requested task or category will take.
    ///
    /// Has no side effects; recording the result is a separate call.
    pub fn predict(&self, request: &PredictionRequest) -> StintResult<PredictionResult> {
        request.validate()?;

        let conservativity = match request.conservativity {
            Some(c) => c,
            None => self.settings.conservativity()?,
        };
        debug!(conservativity = %conservativity, mode = conservativity.label(), "Resolved conservativity");
        let category = request.category.trim();
        let task = request.task_identifier.as_deref().map(str::trim);

        // Exact task history first
        if let Some(task) = task {
            let durations = self.eligible_durations(&SampleQuery::task(task))?;
            if !durations.is_empty() {
                debug!(task = %task, samples = durations.len(), "Predicting from exact task history");
                return Ok(self.estimate(request, &durations, conservativity, MatchBasis::ExactTask));
            }
        }

        // Fall back to the category
        let durations = self.eligible_durations(&SampleQuery::category(category))?;
        if !durations.is_empty() {
            debug!(category = %category, samples = durations.len(), "Predicting from category history");
            return Ok(self.estimate(request, &durations, conservativity, MatchBasis::Category));
        }

        debug!(category = %category, "No usable history, returning cold-start estimate");
        Ok(self.cold_start(request, conservativity))
    }

    /// Durations of matching samples; zero-length samples carry no signal.
    fn eligible_durations(&self, query: &SampleQuery) -> StintResult<Vec<u64>> {
        Ok(self
            .samples
            .query_samples(query)?
            .into_iter()
            .map(|s| s.duration_ms)
            .filter(|&d| d > 0)
            .collect())
    }

    fn estimate(
        &self,
        request: &PredictionRequest,
        durations: &[u64],
        conservativity: Conservativity,
        basis: MatchBasis,
    ) -> PredictionResult {
        let count = durations.len();
        let (median, p90) = match median_and_p90(durations) {
            Some((median, _)) if count < 2 => (median, median * self.config.single_sample_p90_factor),
            Some(pair) => pair,
            None => return self.cold_start(request, conservativity),
        };

        let blended = median + (p90 - median) * conservativity.value();
        let predicted_ms = (blended.round() as u64).max(self.config.min_prediction_ms);
        let confidence_percent = self.confidence_percent(count);

        let subject = match basis {
            MatchBasis::ExactTask => format!(
                "past sessions of '{}'",
                request.task_identifier.as_deref().unwrap_or_default().trim()
            ),
            _ => format!("sessions in '{}'", request.category.trim()),
        };
        let explanation = format!(
            "{}% confident, based on {} {}. Median: {}m, P90: {}m. Conservativity: {:.2}.",
            confidence_percent,
            count,
            subject,
            whole_minutes(median),
            whole_minutes(p90),
            conservativity.value()
        );

        PredictionResult {
            category: request.category.trim().to_string(),
            task_identifier: request
                .task_identifier
                .as_deref()
                .map(|t| t.trim().to_string()),
            predicted_ms,
            confidence_percent,
            confidence_label: ConfidenceLabel::from_percent(confidence_percent),
            sample_count: count,
            median_ms: Some(median.round() as u64),
            p90_ms: Some(p90.round() as u64),
            conservativity,
            basis,
            explanation,
        }
    }

    fn cold_start(&self, request: &PredictionRequest, conservativity: Conservativity) -> PredictionResult {
        let predicted_ms = self.config.cold_start_ms;
        PredictionResult {
            category: request.category.trim().to_string(),
            task_identifier: request
                .task_identifier
                .as_deref()
                .map(|t| t.trim().to_string()),
            predicted_ms,
            confidence_percent: 0,
            confidence_label: ConfidenceLabel::Low,
            sample_count: 0,
            median_ms: None,
            p90_ms: None,
            conservativity,
            basis: MatchBasis::ColdStart,
            explanation: format!(
                "No historical data for '{}'. Using default estimate of {}m.",
                request.category.trim(),
                whole_minutes(predicted_ms as f64)
            ),
        }
    }

    /// Linear in the sample count, capped at 100.
    fn confidence_percent(&self, count: usize) -> u8 {
        let step = u64::from(self.config.confidence_per_sample);
        (count as u64).saturating_mul(step).min(100) as u8
    }
}

/// Completed minutes, truncated after rounding to whole milliseconds.
fn whole_minutes(ms: f64) -> u64 {
    ms.round() as u64 / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, StintError};
    use crate::traits::{MockSampleStore, MockSettingsProvider};
    use crate::types::DurationSample;

    fn minutes(task: &str, category: &str, values: &[u64]) -> Vec<DurationSample> {
        values
            .iter()
            .map(|m| DurationSample::new(task, category, m * 60_000, 50.0))
            .collect()
    }

    fn balanced_settings() -> Arc<MockSettingsProvider> {
        let mut settings = MockSettingsProvider::new();
        settings
            .expect_conservativity()
            .returning(|| Ok(Conservativity::BALANCED));
        Arc::new(settings)
    }

    #[test]
    fn test_category_prediction() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .withf(|q| q.category.as_deref() == Some("coding"))
            .times(1)
            .returning(|_| Ok(minutes("a", "coding", &[20, 30, 30, 40, 50])));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();

        assert_eq!(result.basis, MatchBasis::Category);
        assert_eq!(result.predicted_ms, 38 * 60_000);
        assert_eq!(result.median_ms, Some(30 * 60_000));
        assert_eq!(result.p90_ms, Some(46 * 60_000));
        assert_eq!(result.sample_count, 5);
        assert_eq!(result.confidence_percent, 40);
        assert_eq!(result.confidence_label, ConfidenceLabel::Medium);
        assert_eq!(
            result.explanation,
            "40% confident, based on 5 sessions in 'coding'. Median: 30m, P90: 46m. Conservativity: 0.50."
        );
    }

    #[test]
    fn test_explanation_truncates_minutes() {
        let mut store = MockSampleStore::new();
        store.expect_query_samples().returning(|_| {
            Ok(vec![
                DurationSample::new("a", "coding", 1_790_000, 50.0),
                DurationSample::new("a", "coding", 1_790_000, 50.0),
            ])
        });

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();
        assert_eq!(result.predicted_ms, 1_790_000);
        assert!(
            result.explanation.contains("Median: 29m, P90: 29m."),
            "{}",
            result.explanation
        );
    }

    #[test]
    fn test_exact_task_preferred() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .withf(|q| q.task_identifier.as_deref() == Some("standup"))
            .times(1)
            .returning(|_| Ok(minutes("standup", "writing", &[15, 15])));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine
            .predict(&PredictionRequest::new("writing").with_task("standup"))
            .unwrap();

        assert_eq!(result.basis, MatchBasis::ExactTask);
        assert_eq!(result.predicted_ms, 15 * 60_000);
        assert!(result.explanation.contains("past sessions of 'standup'"));
    }

    #[test]
    fn test_falls_back_to_category() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .withf(|q| q.task_identifier.is_some())
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_query_samples()
            .withf(|q| q.category.as_deref() == Some("research"))
            .times(1)
            .returning(|_| Ok(minutes("paper", "research", &[60])));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine
            .predict(&PredictionRequest::new("research").with_task("new paper"))
            .unwrap();

        assert_eq!(result.basis, MatchBasis::Category);
        // One sample: p90 = median * 1.5, blended at 0.5.
        assert_eq!(result.p90_ms, Some(90 * 60_000));
        assert_eq!(result.predicted_ms, 75 * 60_000);
        assert_eq!(result.confidence_percent, 8);
        assert_eq!(result.confidence_label, ConfidenceLabel::Low);
    }

    #[test]
    fn test_cold_start() {
        let mut store = MockSampleStore::new();
        store.expect_query_samples().returning(|_| Ok(Vec::new()));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();

        assert!(result.is_cold_start());
        assert_eq!(result.predicted_ms, 1_800_000);
        assert_eq!(result.confidence_percent, 0);
        assert_eq!(result.confidence_label, ConfidenceLabel::Low);
        assert_eq!(result.median_ms, None);
        assert!(result.explanation.contains("No historical data"));
    }

    #[test]
    fn test_zero_durations_are_ignored() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .returning(|_| Ok(minutes("a", "coding", &[0, 0])));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();
        assert!(result.is_cold_start());
    }

    #[test]
    fn test_minimum_floor() {
        let mut store = MockSampleStore::new();
        store.expect_query_samples().returning(|_| {
            Ok(vec![
                DurationSample::new("blink", "coding", 1_000, 50.0),
                DurationSample::new("blink", "coding", 2_000, 50.0),
            ])
        });

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();
        assert_eq!(result.predicted_ms, 60_000);
    }

    #[test]
    fn test_override_skips_settings() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .returning(|_| Ok(minutes("a", "coding", &[20, 30, 30, 40, 50])));
        let mut settings = MockSettingsProvider::new();
        settings.expect_conservativity().never();

        let engine = PredictionEngine::new(Arc::new(store), Arc::new(settings));
        let aggressive = engine
            .predict(&PredictionRequest::new("coding").with_conservativity(Conservativity::AGGRESSIVE))
            .unwrap();
        let conservative = engine
            .predict(
                &PredictionRequest::new("coding").with_conservativity(Conservativity::CONSERVATIVE),
            )
            .unwrap();

        assert_eq!(aggressive.predicted_ms, 30 * 60_000);
        assert_eq!(conservative.predicted_ms, 46 * 60_000);
    }

    #[test]
    fn test_confidence_caps_at_100() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .returning(|_| Ok(minutes("a", "coding", &[10; 20])));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        let result = engine.predict(&PredictionRequest::new("coding")).unwrap();
        assert_eq!(result.confidence_percent, 100);
        assert_eq!(result.confidence_label, ConfidenceLabel::High);
    }

    #[test]
    fn test_empty_category_rejected_before_lookup() {
        let mut store = MockSampleStore::new();
        store.expect_query_samples().never();
        let mut settings = MockSettingsProvider::new();
        settings.expect_conservativity().never();

        let engine = PredictionEngine::new(Arc::new(store), Arc::new(settings));
        let err = engine.predict(&PredictionRequest::new("  ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
    }

    #[test]
    fn test_store_error_propagates() {
        let mut store = MockSampleStore::new();
        store
            .expect_query_samples()
            .returning(|_| Err(StintError::database("disk on fire")));

        let engine = PredictionEngine::new(Arc::new(store), balanced_settings());
        assert!(matches!(
            engine.predict(&PredictionRequest::new("coding")),
            Err(StintError::Database { .. })
        ));
    }
}
