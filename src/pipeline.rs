//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Rhythm.
//! It runs a raw recording through every stage and returns the analysis or
//! the encoded JSON report.

use crate::binner::DailyBinner;
use crate::config::PipelineConfig;
use crate::double_plot::DoublePlotBuilder;
use crate::encoder::ReportEncoder;
use crate::epoch::EpochInferencer;
use crate::error::ComputeError;
use crate::grid::GridRegularizer;
use crate::metrics::DailyMetricsEngine;
use crate::rhythm::RhythmStatsEngine;
use crate::timestamp::TimestampNormalizer;
use crate::types::{RawRecording, RhythmAnalysis, RhythmPayload, RunContext};
use log::{debug, info};

/// Analyze a raw recording.
///
/// Pipeline stages:
/// 1. TimestampNormalizer - Parse, drop and sort rows
/// 2. EpochInferencer - Median spacing snapped to a divisor of a day
/// 3. GridRegularizer - Average samples into fixed slots
/// 4. DailyBinner - Reshape into calendar-day rows
/// 5. DailyMetricsEngine / RhythmStatsEngine / DoublePlotBuilder
///
/// A `light_threshold_lux` carried by the recording overrides the one in
/// `config`.
pub fn analyze_recording(
    recording: &RawRecording,
    config: &PipelineConfig,
) -> Result<RhythmAnalysis, ComputeError> {
    config.validate()?;
    let light_threshold_lux = effective_light_threshold(recording, config)?;

    // Stage 1: Normalize timestamps
    let normalized = TimestampNormalizer::normalize(recording, config)?;

    // Stage 2: Infer the sampling epoch
    let epoch = EpochInferencer::infer(&normalized.series.timestamps)?;

    // Stage 3: Regularize onto the grid
    let grid = GridRegularizer::regularize(&normalized.series, epoch)?;

    // Stage 4: Bin into days
    let daily = DailyBinner::bin(&grid)?;

    let context = RunContext {
        epoch,
        bins_per_day: epoch.bins_per_day(),
        day0: daily.day0,
        light_threshold_lux,
        config: config.clone(),
    };
    debug!(
        "run context: epoch {}s, {} bins/day, day0 {}, threshold {} lux",
        epoch.seconds(),
        context.bins_per_day,
        context.day0,
        light_threshold_lux
    );

    // Stage 5: Metrics and views
    let metrics = DailyMetricsEngine::compute(&daily, &context);
    let rhythm = RhythmStatsEngine::compute(&daily.activity, epoch, config);
    let double_plot = DoublePlotBuilder::build(&daily);
    let complete_days = DoublePlotBuilder::complete_days(&daily, config);

    info!(
        "analyzed {} days ({} complete) from {} of {} rows",
        daily.total_days(),
        complete_days.complete_days(),
        normalized.series.len(),
        normalized.total_rows
    );

    Ok(RhythmAnalysis {
        context,
        daily,
        metrics,
        rhythm,
        double_plot,
        complete_days,
        dropped_rows: normalized.dropped_rows,
        total_rows: normalized.total_rows,
        source: recording.source.clone(),
    })
}

fn effective_light_threshold(
    recording: &RawRecording,
    config: &PipelineConfig,
) -> Result<f64, ComputeError> {
    match recording.light_threshold_lux {
        Some(lux) if !lux.is_finite() => Err(ComputeError::ConfigurationError(format!(
            "recording light threshold must be finite, got {lux}"
        ))),
        Some(lux) => Ok(lux),
        None => Ok(config.light_threshold_lux),
    }
}

/// Reusable processor holding a configuration and a report encoder.
///
/// All reports produced by one processor share its encoder's instance ID.
pub struct RhythmProcessor {
    config: PipelineConfig,
    encoder: ReportEncoder,
}

impl Default for RhythmProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RhythmProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            encoder: ReportEncoder::new(),
        }
    }

    /// Create a processor with a specific configuration
    pub fn with_config(config: PipelineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            encoder: ReportEncoder::new(),
        })
    }

    /// Replace the report encoder
    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without encoding
    pub fn analyze(&self, recording: &RawRecording) -> Result<RhythmAnalysis, ComputeError> {
        analyze_recording(recording, &self.config)
    }

    /// Run the pipeline and build the report payload
    pub fn process(&self, recording: &RawRecording) -> Result<RhythmPayload, ComputeError> {
        let analysis = self.analyze(recording)?;
        Ok(self.encoder.encode(&analysis))
    }

    /// Run the pipeline and encode the report as JSON
    pub fn process_to_json(&self, recording: &RawRecording) -> Result<String, ComputeError> {
        let analysis = self.analyze(recording)?;
        self.encoder.encode_to_json(&analysis)
    }
}
