//! Running per-task aggregates, maintained without rescanning history.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::StintResult;
use crate::traits::AggregateStore;
use crate::types::{validate_duration, validate_key, validate_quality, TaskAggregate};

/// Folds new samples into their task aggregate.
pub struct AggregateUpdater {
    store: Arc<dyn AggregateStore>,
}

impl AggregateUpdater {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    /// Fold one sample into the aggregate for `identifier`.
    ///
    /// The read-modify-write runs inside [`AggregateStore::update`], so two
    /// concurrent samples for the same identifier are both counted.
    pub fn apply_sample(
        &self,
        identifier: &str,
        category: &str,
        duration_ms: u64,
        quality_score: f64,
    ) -> StintResult<TaskAggregate> {
        validate_key("identifier", identifier)?;
        validate_key("category", category)?;
        validate_duration(duration_ms)?;
        validate_quality(quality_score)?;

        let identifier = identifier.trim();
        let category = category.trim();
        let now = Utc::now();
        let fold = |previous: Option<TaskAggregate>| {
            TaskAggregate::fold(previous, identifier, category, duration_ms, quality_score, now)
        };

        let aggregate = self.store.update(identifier, &fold)?;
        debug!(
            identifier = %identifier,
            sample_count = aggregate.sample_count,
            total_duration_ms = aggregate.total_duration_ms,
            "Updated task aggregate"
        );
        Ok(aggregate)
    }

    pub fn aggregate(&self, identifier: &str) -> StintResult<Option<TaskAggregate>> {
        self.store.get(identifier.trim())
    }

    pub fn aggregates(&self, category: Option<&str>) -> StintResult<Vec<TaskAggregate>> {
        self.store.list(category.map(str::trim))
    }

    /// Drop the aggregate for `identifier`. Samples are left untouched.
    pub fn reset(&self, identifier: &str) -> StintResult<bool> {
        let removed = self.store.reset(identifier.trim())?;
        if removed {
            debug!(identifier = %identifier, "Reset task aggregate");
        }
        Ok(removed)
    }

    /// Sessions folded into all aggregates.
    pub fn total_sessions(&self) -> StintResult<u64> {
        Ok(self
            .store
            .list(None)?
            .iter()
            .map(|a| a.sample_count)
            .sum())
    }
}
