//! Report encoding
//!
//! Turns a [`RhythmAnalysis`] into the JSON report payload. Missing matrix
//! slots are written as `null`.

use crate::error::ComputeError;
use crate::types::{
    DayWindow, MatrixBundle, RhythmAnalysis, RhythmPayload, RhythmProducer, RhythmProvenance,
    RhythmSummary, SamplingSummary,
};
use crate::{PRODUCER_NAME, RHYTHM_VERSION};
use chrono::Utc;
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Encoder for rhythm report payloads
pub struct ReportEncoder {
    instance_id: String,
    include_matrices: bool,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            include_matrices: false,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            include_matrices: false,
        }
    }

    /// Also emit the daily and 48-hour matrices
    pub fn with_matrices(mut self, include: bool) -> Self {
        self.include_matrices = include;
        self
    }

    /// Build the report payload
    pub fn encode(&self, analysis: &RhythmAnalysis) -> RhythmPayload {
        let producer = RhythmProducer {
            name: PRODUCER_NAME.to_string(),
            version: RHYTHM_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        let provenance = RhythmProvenance {
            source: analysis.source.clone(),
            computed_at_utc: Utc::now().to_rfc3339(),
        };

        let sampling = SamplingSummary {
            epoch_seconds: analysis.context.epoch.seconds(),
            bins_per_day: analysis.context.bins_per_day,
            total_days: analysis.daily.total_days(),
            day0: analysis.context.day0,
            day_start_dates: analysis.daily.dates(),
            total_rows: analysis.total_rows,
            dropped_rows: analysis.dropped_rows.clone(),
            light_threshold_lux: analysis.context.light_threshold_lux,
        };

        let days = analysis
            .metrics
            .iter()
            .zip(&analysis.complete_days.mask)
            .map(|(metrics, &complete)| DayWindow {
                metrics: metrics.clone(),
                complete,
            })
            .collect();

        let rhythm = RhythmSummary {
            is: analysis.rhythm.interdaily_stability,
            iv: analysis.rhythm.intradaily_variability,
            hourly_profile: analysis.rhythm.hourly_profile.clone(),
            valid_hourly_observations: analysis.rhythm.valid_hourly_observations,
            complete_days: analysis.complete_days.complete_days(),
        };

        RhythmPayload {
            report_version: REPORT_VERSION.to_string(),
            producer,
            provenance,
            sampling,
            days,
            rhythm,
            matrices: self.include_matrices.then(|| matrix_bundle(analysis)),
        }
    }

    /// Encode to JSON string
    pub fn encode_to_json(&self, analysis: &RhythmAnalysis) -> Result<String, ComputeError> {
        let payload = self.encode(analysis);
        serde_json::to_string_pretty(&payload).map_err(ComputeError::JsonError)
    }
}

fn matrix_bundle(analysis: &RhythmAnalysis) -> MatrixBundle {
    let daily = &analysis.daily;
    let double = &analysis.double_plot;
    MatrixBundle {
        daily_activity: daily.activity.clone(),
        daily_light: daily.light.clone(),
        daily_temperature: daily.temperature.clone(),
        double_activity: double.activity.clone(),
        double_light: double.light.clone(),
        double_temperature: double.temperature.clone(),
    }
}
