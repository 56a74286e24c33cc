//! Percentile estimation over historical durations.
//!
//! All functions take raw durations and sort a private copy, so callers can
//! pass samples in storage order.

use serde::{Deserialize, Serialize};

/// Linear-interpolated percentile.
///
/// `p` is clamped to `[0, 100]`. With `n` values sorted ascending:
///
/// ```text
/// index  = (n - 1) * p / 100
/// lower  = floor(index), upper = min(lower + 1, n - 1)
/// result = data[lower] * (1 - w) + data[upper] * w,  w = index - lower
/// ```
///
/// Returns `None` for empty input.
pub fn percentile(data: &[f64], p: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(percentile_sorted(&sorted, p))
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
    let n = sorted.len();
    let index = (n - 1) as f64 * p / 100.0;
    let lower = index.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let weight = index - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

/// Median and 90th percentile in one pass over a single sorted copy.
pub fn median_and_p90(durations: &[u64]) -> Option<(f64, f64)> {
    if durations.is_empty() {
        return None;
    }
    let sorted = sorted_f64(durations);
    Some((percentile_sorted(&sorted, 50.0), percentile_sorted(&sorted, 90.0)))
}

fn sorted_f64(durations: &[u64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = durations.iter().map(|&d| d as f64).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Descriptive statistics over a set of durations, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationStats {
    pub count: usize,
    pub min_ms: u64,
    pub max_ms: u64,
    pub median_ms: f64,
    pub mean_ms: f64,
    /// Sample standard deviation; 0 for a single value.
    pub std_dev_ms: f64,
}

impl DurationStats {
    pub fn from_durations(durations: &[u64]) -> Option<Self> {
        let min_ms = *durations.iter().min()?;
        let max_ms = *durations.iter().max()?;
        let sorted = sorted_f64(durations);
        let count = sorted.len();

        let mean_ms = sorted.iter().sum::<f64>() / count as f64;
        let std_dev_ms = if count > 1 {
            let variance = sorted
                .iter()
                .map(|d| (d - mean_ms).powi(2))
                .sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            min_ms,
            max_ms,
            median_ms: percentile_sorted(&sorted, 50.0),
            mean_ms,
            std_dev_ms,
        })
    }
}
