//! Shipped store implementations.
//!
//! Both implement [`SampleStore`](crate::traits::SampleStore),
//! [`AggregateStore`](crate::traits::AggregateStore),
//! [`PredictionStore`](crate::traits::PredictionStore) and
//! [`SettingsStore`](crate::traits::SettingsStore), so one instance can back a
//! whole [`Tracker`](crate::Tracker).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
