//! Prediction accuracy tracking.
//!
//! Every prediction a caller chooses to keep is stored with an empty outcome.
//! Once the real duration is known the record is reconciled exactly once, and
//! accuracy is derived from the mean absolute percentage error (MAPE) of all
//! reconciled records:
//!
//! ```text
//! accuracy = max(0, (1 - MAPE) * 100)
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StintError, StintResult};
use crate::traits::PredictionStore;
use crate::types::{validate_key, AccuracyReport, Conservativity, PredictionRecord};

/// Records predictions and scores them against observed outcomes.
pub struct AccuracyTracker {
    store: Arc<dyn PredictionStore>,
}

impl AccuracyTracker {
    pub fn new(store: Arc<dyn PredictionStore>) -> Self {
        Self { store }
    }

    /// Persist a prediction awaiting its outcome.
    pub fn record(
        &self,
        category: &str,
        predicted_ms: u64,
        conservativity: Conservativity,
    ) -> StintResult<Uuid> {
        validate_key("category", category)?;
        let record = PredictionRecord::new(category.trim(), predicted_ms, conservativity);
        let id = self.store.save(&record)?;
        debug!(id = %id, category = %record.category, predicted_ms, "Recorded prediction");
        Ok(id)
    }

    /// Attach the observed duration to a prediction.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadyReconciled` when the
    /// outcome was set before, including by a concurrent caller.
    pub fn reconcile(&self, record_id: Uuid, actual_ms: u64) -> StintResult<PredictionRecord> {
        let existing = self
            .store
            .find(record_id)?
            .ok_or_else(|| StintError::not_found(record_id.to_string()))?;
        if existing.is_reconciled() {
            return Err(StintError::already_reconciled(record_id));
        }

        if !self.store.update_actual(record_id, actual_ms, Utc::now())? {
            // Lost the race to another reconciliation.
            return Err(StintError::already_reconciled(record_id));
        }

        let record = self
            .store
            .find(record_id)?
            .ok_or_else(|| StintError::not_found(record_id.to_string()))?;
        info!(
            id = %record_id,
            predicted_ms = record.predicted_ms,
            actual_ms,
            "Reconciled prediction"
        );
        Ok(record)
    }

    /// Accuracy percentage in `[0, 100]`, one decimal. 0 without evidence.
    pub fn accuracy(&self, category: Option<&str>) -> StintResult<f64> {
        Ok(self.report(category)?.accuracy_percent)
    }

    pub fn report(&self, category: Option<&str>) -> StintResult<AccuracyReport> {
        let category = category.map(str::trim);
        let errors: Vec<f64> = self
            .store
            .reconciled(category)?
            .iter()
            .filter_map(PredictionRecord::absolute_percentage_error)
            .collect();

        if errors.is_empty() {
            return Ok(AccuracyReport {
                category: category.map(str::to_string),
                accuracy_percent: 0.0,
                mean_absolute_percentage_error: None,
                reconciled_count: 0,
            });
        }

        let mape = errors.iter().sum::<f64>() / errors.len() as f64;
        let accuracy = ((1.0 - mape) * 100.0).clamp(0.0, 100.0);

        Ok(AccuracyReport {
            category: category.map(str::to_string),
            accuracy_percent: (accuracy * 10.0).round() / 10.0,
            mean_absolute_percentage_error: Some(mape),
            reconciled_count: errors.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::MemoryStore;

    fn tracker() -> AccuracyTracker {
        AccuracyTracker::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_no_evidence() {
        let tracker = tracker();
        assert_eq!(tracker.accuracy(None).unwrap(), 0.0);

        // Unreconciled records do not count.
        tracker.record("coding", 1_000, Conservativity::default()).unwrap();
        let report = tracker.report(None).unwrap();
        assert_eq!(report.accuracy_percent, 0.0);
        assert_eq!(report.reconciled_count, 0);
        assert_eq!(report.mean_absolute_percentage_error, None);
    }

    #[test]
    fn test_exact_prediction() {
        let tracker = tracker();
        let id = tracker.record("coding", 1_800_000, Conservativity::default()).unwrap();
        let record = tracker.reconcile(id, 1_800_000).unwrap();

        assert_eq!(record.actual_ms, Some(1_800_000));
        assert!(record.reconciled_at.is_some());
        assert_eq!(tracker.accuracy(None).unwrap(), 100.0);
    }

    #[test]
    fn test_mape() {
        let tracker = tracker();
        let a = tracker.record("coding", 1_200, Conservativity::default()).unwrap();
        let b = tracker.record("coding", 900, Conservativity::default()).unwrap();
        tracker.reconcile(a, 1_000).unwrap();
        tracker.reconcile(b, 1_000).unwrap();

        // Errors 0.2 and 0.1.
        let report = tracker.report(None).unwrap();
        assert_eq!(report.reconciled_count, 2);
        assert!((report.mean_absolute_percentage_error.unwrap() - 0.15).abs() < 1e-12);
        assert_eq!(report.accuracy_percent, 85.0);
    }

    #[test]
    fn test_accuracy_floors_at_zero() {
        let tracker = tracker();
        let id = tracker.record("coding", 5_000, Conservativity::default()).unwrap();
        tracker.reconcile(id, 1_000).unwrap();
        assert_eq!(tracker.accuracy(None).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_actual_is_ignored() {
        let tracker = tracker();
        let id = tracker.record("coding", 5_000, Conservativity::default()).unwrap();
        tracker.reconcile(id, 0).unwrap();
        assert_eq!(tracker.report(None).unwrap().reconciled_count, 0);
    }

    #[test]
    fn test_category_filter() {
        let tracker = tracker();
        let a = tracker.record("coding", 1_000, Conservativity::default()).unwrap();
        let b = tracker.record("writing", 2_000, Conservativity::default()).unwrap();
        tracker.reconcile(a, 1_000).unwrap();
        tracker.reconcile(b, 1_000).unwrap();

        assert_eq!(tracker.accuracy(Some("coding")).unwrap(), 100.0);
        assert_eq!(tracker.accuracy(Some("writing")).unwrap(), 0.0);
        assert_eq!(tracker.accuracy(Some("research")).unwrap(), 0.0);
        assert_eq!(tracker.accuracy(None).unwrap(), 50.0);
    }

    #[test]
    fn test_reconcile_errors() {
        let tracker = tracker();
        let err = tracker.reconcile(Uuid::new_v4(), 1_000).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecNotFound);

        let id = tracker.record("coding", 1_000, Conservativity::default()).unwrap();
        tracker.reconcile(id, 1_000).unwrap();
        let err = tracker.reconcile(id, 2_000).unwrap_err();
        assert_eq!(err.code(), ErrorCode::RecAlreadyReconciled);

        // The first outcome is kept.
        assert_eq!(tracker.accuracy(None).unwrap(), 100.0);
    }

    #[test]
    fn test_record_rejects_empty_category() {
        let err = tracker().record(" ", 1_000, Conservativity::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValMissingField);
    }
}
