//! Timestamp normalization
//!
//! This module turns the loader's heterogeneous timestamp column into sortable
//! timezone-naive instants.
//! - Native date-times pass through unchanged
//! - Spreadsheet serial day counts are converted from the 1899-12-30 epoch
//! - Text is tried against a fixed, ordered list of formats
//!
//! Rows whose timestamp fails every representation are dropped across all
//! channels, then the remaining rows are jointly sorted by time.

use crate::config::PipelineConfig;
use crate::error::ComputeError;
use crate::types::{NormalizedSeries, RawRecording, RawTimestamp, TimeSeries};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::{debug, warn};

/// Text formats in the order they are tried; the first match wins
pub const TEXT_FORMATS: &[&str] = &[
    // ISO 8601 with fractional seconds
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    // ISO 8601 without seconds
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    // day/month/year
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    // month/day/year
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

// Roughly +/- 27,000 years around the origin
const MAX_SERIAL_DAYS: f64 = 1.0e7;

/// Normalizer for the raw timestamp channel
pub struct TimestampNormalizer;

impl TimestampNormalizer {
    /// Parse, filter and sort a raw recording
    pub fn normalize(
        recording: &RawRecording,
        config: &PipelineConfig,
    ) -> Result<NormalizedSeries, ComputeError> {
        check_channel_lengths(recording)?;

        let total_rows = recording.timestamps.len();
        let parsed: Vec<Option<NaiveDateTime>> =
            recording.timestamps.iter().map(parse_timestamp).collect();

        let mut dropped_rows = Vec::new();
        let mut kept: Vec<(NaiveDateTime, usize)> = Vec::with_capacity(total_rows);
        for (row, value) in parsed.into_iter().enumerate() {
            match value {
                Some(ts) => kept.push((ts, row)),
                None => dropped_rows.push(row),
            }
        }

        if !dropped_rows.is_empty() {
            warn!(
                "dropped {} of {} rows with unparseable timestamps",
                dropped_rows.len(),
                total_rows
            );
        }

        if kept.len() < config.min_valid_rows {
            return Err(ComputeError::ParseError {
                valid: kept.len(),
                required: config.min_valid_rows,
            });
        }

        // Stable: equal timestamps keep their original row order
        kept.sort_by_key(|&(ts, _)| ts);

        let pick = |channel: &[f64]| -> Vec<f64> {
            kept.iter().map(|&(_, row)| channel[row]).collect()
        };

        let series = TimeSeries {
            timestamps: kept.iter().map(|&(ts, _)| ts).collect(),
            activity: pick(&recording.activity),
            light: pick(&recording.light),
            temperature: recording.temperature.as_deref().map(pick),
        };

        if let (Some(first), Some(last)) = (series.timestamps.first(), series.timestamps.last()) {
            debug!("normalized {} rows spanning {} .. {}", series.len(), first, last);
        }

        Ok(NormalizedSeries {
            series,
            dropped_rows,
            total_rows,
        })
    }
}

fn check_channel_lengths(recording: &RawRecording) -> Result<(), ComputeError> {
    let n = recording.timestamps.len();

    let mut channels = vec![
        ("activity", recording.activity.len()),
        ("light", recording.light.len()),
    ];
    if let Some(temperature) = &recording.temperature {
        channels.push(("temperature", temperature.len()));
    }

    for (name, len) in channels {
        if len != n {
            return Err(ComputeError::ConfigurationError(format!(
                "{name} channel has {len} samples but there are {n} timestamps"
            )));
        }
    }
    Ok(())
}

/// Parse a single raw timestamp; `None` if no representation applies
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<NaiveDateTime> {
    match raw {
        RawTimestamp::DateTime(ts) => Some(*ts),
        RawTimestamp::Serial(days) => from_serial_days(*days),
        RawTimestamp::Text(text) => parse_text(text),
    }
}

/// Parse text against [`TEXT_FORMATS`] in order
pub fn parse_text(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    TEXT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}

/// Convert a spreadsheet serial day count to an instant, to the millisecond
pub fn from_serial_days(days: f64) -> Option<NaiveDateTime> {
    if !days.is_finite() || days.abs() > MAX_SERIAL_DAYS {
        return None;
    }
    let origin = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * MILLIS_PER_DAY).round();
    origin.checked_add_signed(Duration::milliseconds(millis as i64))
}
