//! Conservativity factor for blending optimistic and pessimistic estimates.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{StintError, StintResult};

/// Blend factor in `[0, 1]` between the median (0.0) and the 90th
/// percentile (1.0) of historical durations.
///
/// Construction validates the range, so a `Conservativity` held anywhere in
/// the crate is always usable as-is.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Conservativity(f64);

impl Conservativity {
    /// Optimistic: predict the median.
    pub const AGGRESSIVE: Conservativity = Conservativity(0.0);
    /// Midpoint between median and p90.
    pub const BALANCED: Conservativity = Conservativity(0.5);
    /// Pessimistic: predict the 90th percentile.
    pub const CONSERVATIVE: Conservativity = Conservativity(1.0);

    /// Create a validated conservativity value.
    pub fn new(value: f64) -> StintResult<Self> {
        if !value.is_finite() || !(0.0..=1.0).contains(&value) {
            return Err(StintError::out_of_range("conservativity", value, 0.0, 1.0));
        }
        Ok(Self(value))
    }

    /// Raw factor.
    pub fn value(self) -> f64 {
        self.0
    }

    /// Human label used in logs.
    pub fn label(self) -> &'static str {
        if self.0 < 0.3 {
            "aggressive"
        } else if self.0 > 0.7 {
            "conservative"
        } else {
            "balanced"
        }
    }
}

impl Default for Conservativity {
    fn default() -> Self {
        Self::BALANCED
    }
}

impl TryFrom<f64> for Conservativity {
    type Error = StintError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Conservativity> for f64 {
    fn from(value: Conservativity) -> Self {
        value.0
    }
}

impl fmt::Display for Conservativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
