//! Duration prediction from historical samples.
//!
//! The engine looks up samples for the exact task first, falls back to the
//! category, and blends the median and 90th percentile of what it finds by
//! the conservativity factor:
//!
//! ```text
//! predicted = median + (p90 - median) * conservativity
//! ```
//!
//! With no usable history a fixed cold-start estimate is returned instead of
//! an error.

mod engine;

pub use engine::PredictionEngine;
