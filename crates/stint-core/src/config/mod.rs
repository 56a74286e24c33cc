//! Configuration system for stint.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{StintError, StintResult};
use crate::types::{CategoryRules, Conservativity};

/// Default estimate returned when no history exists: 30 minutes.
pub const DEFAULT_COLD_START_MS: u64 = 30 * 60 * 1000;
/// Predictions never go below one minute.
pub const DEFAULT_MIN_PREDICTION_MS: u64 = 60 * 1000;
/// Confidence gained per eligible sample, in percent.
pub const DEFAULT_CONFIDENCE_PER_SAMPLE: u8 = 8;
/// p90 stand-in multiplier when only one sample exists.
pub const DEFAULT_SINGLE_SAMPLE_P90_FACTOR: f64 = 1.5;

/// Tuning knobs of the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Estimate used when no eligible samples exist.
    pub cold_start_ms: u64,
    /// Lower bound for every estimate.
    pub min_prediction_ms: u64,
    /// Linear confidence step per sample, capped at 100.
    pub confidence_per_sample: u8,
    /// `p90 = median * factor` when fewer than two samples exist.
    pub single_sample_p90_factor: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            cold_start_ms: DEFAULT_COLD_START_MS,
            min_prediction_ms: DEFAULT_MIN_PREDICTION_MS,
            confidence_per_sample: DEFAULT_CONFIDENCE_PER_SAMPLE,
            single_sample_p90_factor: DEFAULT_SINGLE_SAMPLE_P90_FACTOR,
        }
    }
}

/// Main tracker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Path to the SQLite database used by [`Tracker::open`](crate::Tracker::open).
    pub db_path: PathBuf,
    /// Conservativity seeded into fresh settings.
    pub default_conservativity: Conservativity,
    /// Prediction engine tuning.
    pub prediction: PredictionConfig,
    /// Free-text classification table.
    pub categories: CategoryRules,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let stint_dir = dirs::home_dir()
            .map(|h| h.join(".stint"))
            .unwrap_or_else(|| PathBuf::from(".stint"));

        Self {
            db_path: stint_dir.join("stint.db"),
            default_conservativity: Conservativity::default(),
            prediction: PredictionConfig::default(),
            categories: CategoryRules::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> StintResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| StintError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| StintError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| StintError::Configuration(e.to_string()))?,
            _ => {
                return Err(StintError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Reads:
    /// - `STINT_DB_PATH`
    /// - `STINT_CONSERVATIVITY` (ignored unless within `[0, 1]`)
    /// - `STINT_COLD_START_MS`
    /// - `STINT_MIN_PREDICTION_MS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STINT_DB_PATH") {
            config.db_path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("STINT_CONSERVATIVITY") {
            match value.parse::<f64>().map_err(|e| e.to_string()).and_then(|v| {
                Conservativity::new(v).map_err(|e| e.to_string())
            }) {
                Ok(c) => config.default_conservativity = c,
                Err(e) => tracing::warn!(value = %value, error = %e, "Ignoring STINT_CONSERVATIVITY"),
            }
        }

        if let Some(ms) = env_millis("STINT_COLD_START_MS") {
            config.prediction.cold_start_ms = ms;
        }

        if let Some(ms) = env_millis("STINT_MIN_PREDICTION_MS") {
            config.prediction.min_prediction_ms = ms;
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> TrackerConfigBuilder {
        TrackerConfigBuilder::default()
    }

    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> StintResult<()> {
        let factor = self.prediction.single_sample_p90_factor;
        if !factor.is_finite() || factor < 1.0 {
            return Err(StintError::Configuration(format!(
                "single_sample_p90_factor must be a finite value >= 1.0, got {}",
                factor
            )));
        }
        if self.prediction.confidence_per_sample == 0 {
            return Err(StintError::Configuration(
                "confidence_per_sample must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_millis(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|value| parse_millis(name, &value))
}

/// Parse a millisecond count, warning about and ignoring anything else.
fn parse_millis(name: &str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(e) => {
            tracing::warn!(value = %value, error = %e, "Ignoring {}", name);
            None
        }
    }
}

/// Builder for TrackerConfig.
#[derive(Default)]
pub struct TrackerConfigBuilder {
    config: TrackerConfig,
}

impl TrackerConfigBuilder {
    /// Set database path.
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    /// Set the conservativity seeded into fresh settings.
    pub fn default_conservativity(mut self, conservativity: Conservativity) -> Self {
        self.config.default_conservativity = conservativity;
        self
    }

    /// Set prediction engine tuning.
    pub fn prediction(mut self, prediction: PredictionConfig) -> Self {
        self.config.prediction = prediction;
        self
    }

    /// Set the classification table.
    pub fn categories(mut self, categories: CategoryRules) -> Self {
        self.config.categories = categories;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> TrackerConfig {
        self.config
    }
}
