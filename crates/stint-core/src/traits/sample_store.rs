//! Sample store trait definition.

use chrono::{DateTime, Utc};

use crate::error::StintResult;
use crate::types::{DurationSample, SampleQuery};

/// Append-only log of completed task durations.
#[cfg_attr(test, mockall::automock)]
pub trait SampleStore: Send + Sync {
    /// Record a completed sample.
    fn append(&self, sample: &DurationSample) -> StintResult<()>;

    /// Withdraw the most recently appended sample equal to `sample`.
    ///
    /// Only used to undo an append whose follow-up write failed. Returns
    /// whether a sample was removed.
    fn remove(&self, sample: &DurationSample) -> StintResult<bool>;

    /// Samples matching the query, oldest first.
    fn query_samples(&self, query: &SampleQuery) -> StintResult<Vec<DurationSample>>;

    /// Samples observed in `[start, end)`, oldest first.
    fn samples_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StintResult<Vec<DurationSample>>;
}
