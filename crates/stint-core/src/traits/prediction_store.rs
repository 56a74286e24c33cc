//! Prediction store trait definition.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StintResult;
use crate::types::PredictionRecord;

/// Persistence for predictions awaiting their observed outcome.
pub trait PredictionStore: Send + Sync {
    /// Persist a new record and return its id.
    fn save(&self, record: &PredictionRecord) -> StintResult<Uuid>;

    /// Fetch a record by id.
    fn find(&self, id: Uuid) -> StintResult<Option<PredictionRecord>>;

    /// Set the actual duration if, and only if, the record exists and has not
    /// been reconciled yet. Returns whether the record was updated.
    fn update_actual(&self, id: Uuid, actual_ms: u64, at: DateTime<Utc>) -> StintResult<bool>;

    /// Reconciled records, optionally restricted to a category.
    fn reconciled(&self, category: Option<&str>) -> StintResult<Vec<PredictionRecord>>;
}
