//! Aggregate store trait definition.

use crate::error::StintResult;
use crate::types::TaskAggregate;

/// Fold applied by [`AggregateStore::update`] to the current row.
///
/// An error aborts the update and leaves the stored aggregate unchanged.
pub type AggregateFold<'a> = &'a dyn Fn(Option<TaskAggregate>) -> StintResult<TaskAggregate>;

/// Durable per-identifier aggregates.
///
/// Implementations must run [`update`](AggregateStore::update) as a single
/// read-modify-write that excludes other writers to the same identifier;
/// the weighted-quality invariant depends on it.
pub trait AggregateStore: Send + Sync {
    /// Read the current aggregate (if any), apply `fold`, persist and return
    /// the result, atomically.
    fn update(&self, identifier: &str, fold: AggregateFold<'_>) -> StintResult<TaskAggregate>;

    /// Fetch one aggregate.
    fn get(&self, identifier: &str) -> StintResult<Option<TaskAggregate>>;

    /// All aggregates, optionally restricted to a category, ordered by
    /// identifier.
    fn list(&self, category: Option<&str>) -> StintResult<Vec<TaskAggregate>>;

    /// Administrative reset. Returns whether an aggregate was removed.
    fn reset(&self, identifier: &str) -> StintResult<bool>;
}
