//! Pipeline configuration
//!
//! Thresholds and window lengths used across the pipeline stages. Every field
//! has a default, so a partial JSON document is a valid configuration.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// Default light threshold (lux)
pub const DEFAULT_LIGHT_THRESHOLD_LUX: f64 = 10.0;

/// Minimum number of parseable rows required to run the pipeline
pub const DEFAULT_MIN_VALID_ROWS: usize = 10;

/// Tunable parameters for a rhythm analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Slots with light strictly above this value count as "in light"
    pub light_threshold_lux: f64,
    /// Fewer parseable timestamps than this is a fatal parse error
    pub min_valid_rows: usize,
    /// Length of the least-active window (hours)
    pub l5_hours: f64,
    /// Length of the most-active window (hours)
    pub m10_hours: f64,
    /// Minimum fraction of valid slots for a sliding window to count
    pub window_coverage: f64,
    /// Minimum fraction of valid activity slots for a complete day
    pub complete_day_coverage: f64,
    /// Minimum valid hourly means for IS/IV
    pub min_hourly_observations: usize,
    /// Minimum valid adjacent hourly pairs for IV
    pub min_iv_pairs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            light_threshold_lux: DEFAULT_LIGHT_THRESHOLD_LUX,
            min_valid_rows: DEFAULT_MIN_VALID_ROWS,
            l5_hours: 5.0,
            m10_hours: 10.0,
            window_coverage: 0.90,
            complete_day_coverage: 0.95,
            min_hourly_observations: 48,
            min_iv_pairs: 24,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from JSON; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Return a copy with a different light threshold
    pub fn with_light_threshold(mut self, lux: f64) -> Self {
        self.light_threshold_lux = lux;
        self
    }

    /// Reject values that would make the pipeline meaningless
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !self.light_threshold_lux.is_finite() {
            return Err(ComputeError::ConfigurationError(
                "light_threshold_lux must be finite".to_string(),
            ));
        }
        for (name, hours) in [("l5_hours", self.l5_hours), ("m10_hours", self.m10_hours)] {
            if !(hours > 0.0 && hours <= 24.0) {
                return Err(ComputeError::ConfigurationError(format!(
                    "{name} must be in (0, 24], got {hours}"
                )));
            }
        }
        for (name, fraction) in [
            ("window_coverage", self.window_coverage),
            ("complete_day_coverage", self.complete_day_coverage),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ComputeError::ConfigurationError(format!(
                    "{name} must be in [0, 1], got {fraction}"
                )));
            }
        }
        if self.min_valid_rows < 2 {
            return Err(ComputeError::ConfigurationError(
                "min_valid_rows must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
