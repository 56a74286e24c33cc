//! Volatile store backed by locked in-process collections.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StintResult;
use crate::traits::{
    AggregateFold, AggregateStore, PredictionStore, SampleStore, SettingsProvider, SettingsStore,
};
use crate::types::{
    Conservativity, DurationSample, PredictionRecord, SampleQuery, Settings, SettingsUpdate,
    TaskAggregate,
};

/// In-memory implementation of every store trait.
///
/// Nothing survives the process. Useful for tests and for callers that keep
/// their own persistence elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    samples: RwLock<Vec<DurationSample>>,
    aggregates: Mutex<BTreeMap<String, TaskAggregate>>,
    predictions: RwLock<HashMap<Uuid, PredictionRecord>>,
    settings: RwLock<Settings>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the given settings instead of the defaults.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            ..Self::default()
        }
    }
}

impl SampleStore for MemoryStore {
    fn append(&self, sample: &DurationSample) -> StintResult<()> {
        self.samples.write()?.push(sample.clone());
        Ok(())
    }

    fn remove(&self, sample: &DurationSample) -> StintResult<bool> {
        let mut samples = self.samples.write()?;
        match samples.iter().rposition(|s| s == sample) {
            Some(index) => {
                samples.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn query_samples(&self, query: &SampleQuery) -> StintResult<Vec<DurationSample>> {
        let samples = self.samples.read()?;
        let mut matched: Vec<DurationSample> =
            samples.iter().filter(|s| query.matches(s)).cloned().collect();
        matched.sort_by_key(|s| s.observed_at);
        Ok(matched)
    }

    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StintResult<Vec<DurationSample>> {
        let samples = self.samples.read()?;
        let mut matched: Vec<DurationSample> = samples
            .iter()
            .filter(|s| s.observed_at >= start && s.observed_at < end)
            .cloned()
            .collect();
        matched.sort_by_key(|s| s.observed_at);
        Ok(matched)
    }
}

impl AggregateStore for MemoryStore {
    fn update(&self, identifier: &str, fold: AggregateFold<'_>) -> StintResult<TaskAggregate> {
        // The map lock is held across the fold.
        let mut aggregates = self.aggregates.lock()?;
        let updated = fold(aggregates.get(identifier).cloned())?;
        aggregates.insert(identifier.to_string(), updated.clone());
        Ok(updated)
    }

    fn get(&self, identifier: &str) -> StintResult<Option<TaskAggregate>> {
        Ok(self.aggregates.lock()?.get(identifier).cloned())
    }

    fn list(&self, category: Option<&str>) -> StintResult<Vec<TaskAggregate>> {
        Ok(self
            .aggregates
            .lock()?
            .values()
            .filter(|a| category.map_or(true, |c| a.category == c))
            .cloned()
            .collect())
    }

    fn reset(&self, identifier: &str) -> StintResult<bool> {
        Ok(self.aggregates.lock()?.remove(identifier).is_some())
    }
}

impl PredictionStore for MemoryStore {
    fn save(&self, record: &PredictionRecord) -> StintResult<Uuid> {
        self.predictions.write()?.insert(record.id, record.clone());
        Ok(record.id)
    }

    fn find(&self, id: Uuid) -> StintResult<Option<PredictionRecord>> {
        Ok(self.predictions.read()?.get(&id).cloned())
    }

    fn update_actual(&self, id: Uuid, actual_ms: u64, at: DateTime<Utc>) -> StintResult<bool> {
        let mut predictions = self.predictions.write()?;
        match predictions.get_mut(&id) {
            Some(record) if record.actual_ms.is_none() => {
                record.actual_ms = Some(actual_ms);
                record.reconciled_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn reconciled(&self, category: Option<&str>) -> StintResult<Vec<PredictionRecord>> {
        let mut records: Vec<PredictionRecord> = self
            .predictions
            .read()?
            .values()
            .filter(|r| r.is_reconciled())
            .filter(|r| category.map_or(true, |c| r.category == c))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }
}

impl SettingsProvider for MemoryStore {
    fn conservativity(&self) -> StintResult<Conservativity> {
        Ok(self.settings.read()?.conservativity)
    }
}

impl SettingsStore for MemoryStore {
    fn settings(&self) -> StintResult<Settings> {
        Ok(self.settings.read()?.clone())
    }

    fn update_settings(&self, update: SettingsUpdate) -> StintResult<Settings> {
        let mut settings = self.settings.write()?;
        settings.apply(update);
        Ok(settings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sample_queries() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .append(&DurationSample::new("b", "coding", 2, 50.0).observed_at(now))
            .unwrap();
        store
            .append(&DurationSample::new("a", "coding", 1, 50.0).observed_at(now - Duration::hours(1)))
            .unwrap();
        store
            .append(&DurationSample::new("c", "writing", 3, 50.0).observed_at(now))
            .unwrap();

        let coding = store.query_samples(&SampleQuery::category("coding")).unwrap();
        assert_eq!(coding.len(), 2);
        assert_eq!(coding[0].task_identifier, "a");

        let exact = store.query_samples(&SampleQuery::task("c")).unwrap();
        assert_eq!(exact.len(), 1);

        let window = store
            .samples_between(now - Duration::minutes(30), now)
            .unwrap();
        assert!(window.is_empty());
        let window = store
            .samples_between(now - Duration::minutes(30), now + Duration::seconds(1))
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn test_remove_sample() {
        let store = MemoryStore::new();
        let sample = DurationSample::new("a", "coding", 1_000, 50.0);
        store.append(&sample).unwrap();
        store.append(&sample).unwrap();

        assert!(store.remove(&sample).unwrap());
        assert_eq!(store.query_samples(&SampleQuery::task("a")).unwrap().len(), 1);
        assert!(store.remove(&sample).unwrap());
        assert!(!store.remove(&sample).unwrap());
    }

    #[test]
    fn test_failed_fold_keeps_aggregate() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .update("a", &|prev| TaskAggregate::fold(prev, "a", "coding", 1_000, 50.0, now))
            .unwrap();
        assert!(store
            .update("a", &|_| Err(crate::error::StintError::validation("rejected")))
            .is_err());
        assert_eq!(store.get("a").unwrap().unwrap().sample_count, 1);
    }

    #[test]
    fn test_conditional_reconcile() {
        let store = MemoryStore::new();
        let record = PredictionRecord::new("coding", 1_000, Conservativity::default());
        let id = store.save(&record).unwrap();

        assert!(store.update_actual(id, 900, Utc::now()).unwrap());
        assert!(!store.update_actual(id, 1_100, Utc::now()).unwrap());
        assert!(!store.update_actual(Uuid::new_v4(), 1_100, Utc::now()).unwrap());
        assert_eq!(store.find(id).unwrap().unwrap().actual_ms, Some(900));
        assert_eq!(store.reconciled(None).unwrap().len(), 1);
        assert!(store.reconciled(Some("writing")).unwrap().is_empty());
    }

    #[test]
    fn test_settings() {
        let store = MemoryStore::with_settings(Settings {
            conservativity: Conservativity::CONSERVATIVE,
            tracked_sites: vec!["github.com".to_string()],
        });
        assert_eq!(store.conservativity().unwrap(), Conservativity::CONSERVATIVE);

        let updated = store
            .update_settings(SettingsUpdate::conservativity(Conservativity::AGGRESSIVE))
            .unwrap();
        assert_eq!(updated.conservativity, Conservativity::AGGRESSIVE);
        assert_eq!(updated.tracked_sites, vec!["github.com".to_string()]);
        assert_eq!(store.settings().unwrap(), updated);
    }
}
