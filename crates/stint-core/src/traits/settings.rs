//! Settings provider traits.

use crate::error::StintResult;
use crate::types::{Conservativity, Settings, SettingsUpdate};

/// Source of the process-wide conservativity.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsProvider: Send + Sync {
    fn conservativity(&self) -> StintResult<Conservativity>;
}

/// Settings that can also be read in full and changed.
pub trait SettingsStore: SettingsProvider {
    fn settings(&self) -> StintResult<Settings>;

    /// Apply a partial update and return the resulting settings.
    fn update_settings(&self, update: SettingsUpdate) -> StintResult<Settings>;
}

/// Fixed settings, typically built from [`TrackerConfig`](crate::config::TrackerConfig).
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSettings {
    conservativity: Conservativity,
}

impl StaticSettings {
    pub fn new(conservativity: Conservativity) -> Self {
        Self { conservativity }
    }
}

impl SettingsProvider for StaticSettings {
    fn conservativity(&self) -> StintResult<Conservativity> {
        Ok(self.conservativity)
    }
}
