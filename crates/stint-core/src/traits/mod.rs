//! Storage and settings contracts the core is written against.
//!
//! The prediction, aggregation and accuracy components only ever talk to these
//! traits. [`crate::store`] ships an in-memory and a SQLite implementation;
//! callers with their own persistence implement the traits directly.

mod aggregate_store;
mod prediction_store;
mod sample_store;
mod settings;

pub use aggregate_store::*;
pub use prediction_store::*;
pub use sample_store::*;
pub use settings::*;
