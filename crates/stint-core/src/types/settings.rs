//! User-adjustable settings consumed by the prediction engine.

use serde::{Deserialize, Serialize};

use super::conservativity::Conservativity;

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Used by every prediction that does not carry its own override.
    pub conservativity: Conservativity,
    /// Domain patterns the activity collector should watch.
    pub tracked_sites: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            conservativity: Conservativity::default(),
            tracked_sites: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply a partial update; absent fields keep their current value.
    pub fn apply(&mut self, update: SettingsUpdate) {
        if let Some(conservativity) = update.conservativity {
            self.conservativity = conservativity;
        }
        if let Some(sites) = update.tracked_sites {
            self.tracked_sites = sites;
        }
    }
}

/// Partial settings update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conservativity: Option<Conservativity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_sites: Option<Vec<String>>,
}

impl SettingsUpdate {
    pub fn conservativity(conservativity: Conservativity) -> Self {
        Self {
            conservativity: Some(conservativity),
            tracked_sites: None,
        }
    }

    pub fn tracked_sites(sites: Vec<String>) -> Self {
        Self {
            conservativity: None,
            tracked_sites: Some(sites),
        }
    }
}
