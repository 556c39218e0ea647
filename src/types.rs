//! Core types for the Synheart Rhythm pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw recordings, the sorted time series, the regular grid, daily
//! matrices, per-day metrics, rhythm statistics and the encoded JSON payload.
//!
//! Missing slots are represented by `f64::NAN` inside grids and matrices, and
//! by `None` for scalar metrics.

use crate::config::PipelineConfig;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seconds in one calendar day
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Number of hour-of-day columns in the hourly profile
pub const HOURS_PER_DAY: usize = 24;

/// Sentinel for a slot with no data
pub const MISSING: f64 = f64::NAN;

/// A timestamp as delivered by the loader, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Spreadsheet serial day count (days since 1899-12-30, fraction = time of day)
    Serial(f64),
    /// Native date-time value
    DateTime(NaiveDateTime),
    /// Free-form text
    Text(String),
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(value: NaiveDateTime) -> Self {
        RawTimestamp::DateTime(value)
    }
}

impl From<f64> for RawTimestamp {
    fn from(value: f64) -> Self {
        RawTimestamp::Serial(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(value: String) -> Self {
        RawTimestamp::Text(value)
    }
}

/// Recording handed over by the loader
///
/// `null` sample values in JSON input are read as missing (NaN).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecording {
    pub timestamps: Vec<RawTimestamp>,
    #[serde(deserialize_with = "nullable_samples")]
    pub activity: Vec<f64>,
    #[serde(deserialize_with = "nullable_samples")]
    pub light: Vec<f64>,
    #[serde(default, deserialize_with = "optional_nullable_samples")]
    pub temperature: Option<Vec<f64>>,
    /// Overrides the configured light threshold when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light_threshold_lux: Option<f64>,
    /// Free-form source label (file name, device id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn nullable_samples<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(MISSING)).collect())
}

fn optional_nullable_samples<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Option<f64>>> = Option::deserialize(deserializer)?;
    Ok(values.map(|v| v.into_iter().map(|x| x.unwrap_or(MISSING)).collect()))
}

/// Sorted, fully parsed multi-channel series
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub timestamps: Vec<NaiveDateTime>,
    pub activity: Vec<f64>,
    pub light: Vec<f64>,
    pub temperature: Option<Vec<f64>>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Output of the timestamp normalizer
#[derive(Debug, Clone)]
pub struct NormalizedSeries {
    /// Valid rows, jointly sorted by timestamp
    pub series: TimeSeries,
    /// Original indices of rows dropped for an unparseable timestamp
    pub dropped_rows: Vec<usize>,
    /// Number of rows in the raw recording
    pub total_rows: usize,
}

/// Sampling interval in whole seconds; always divides 86400
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epoch(u32);

impl Epoch {
    /// One-minute epoch, used when nothing better can be inferred
    pub const FALLBACK: Epoch = Epoch(60);

    /// Build an epoch, rejecting values that do not divide a day
    pub fn new(seconds: u32) -> Option<Self> {
        if seconds > 0 && SECONDS_PER_DAY % seconds == 0 {
            Some(Self(seconds))
        } else {
            None
        }
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn bins_per_day(&self) -> usize {
        (SECONDS_PER_DAY / self.0) as usize
    }

    /// Number of bins covering `hours`, rounded, at least one
    pub fn bins_for_hours(&self, hours: f64) -> usize {
        ((hours * 3600.0 / f64::from(self.0)).round() as usize).max(1)
    }
}

/// Uniform timeline produced by the grid regularizer
#[derive(Debug, Clone, PartialEq)]
pub struct RegularGrid {
    /// Start of the first slot (midnight of the first sample's day)
    pub start: NaiveDateTime,
    pub epoch: Epoch,
    pub activity: Vec<f64>,
    pub light: Vec<f64>,
    pub temperature: Option<Vec<f64>>,
}

impl RegularGrid {
    pub fn len(&self) -> usize {
        self.activity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activity.is_empty()
    }

    /// Start time of slot `index`
    pub fn slot_time(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::seconds(i64::from(self.epoch.seconds()) * index as i64)
    }

    /// The grid's time axis as a time series, one sample per slot
    pub fn to_time_series(&self) -> TimeSeries {
        TimeSeries {
            timestamps: (0..self.len()).map(|i| self.slot_time(i)).collect(),
            activity: self.activity.clone(),
            light: self.light.clone(),
            temperature: self.temperature.clone(),
        }
    }
}

/// Row-major `[day][bin]` matrix of one channel
#[derive(Debug, Clone, PartialEq)]
pub struct DayMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DayMatrix {
    /// Wrap `values` as a `rows x cols` matrix; `None` if the length is wrong
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> Option<Self> {
        (values.len() == rows * cols).then_some(Self { rows, cols, values })
    }

    /// A matrix with every slot missing
    pub fn missing(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![MISSING; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.values[row * self.cols..(row + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Flat row-major view
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// Number of non-missing values in `row`
    pub fn valid_count(&self, row: usize) -> usize {
        self.row(row).iter().filter(|v| !v.is_nan()).count()
    }
}

impl Serialize for DayMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for row in self.iter_rows() {
            seq.serialize_element(row)?;
        }
        seq.end()
    }
}

/// One matrix per channel, one row per complete calendar day
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMatrix {
    /// Calendar date of row 0
    pub day0: NaiveDate,
    pub epoch: Epoch,
    pub activity: DayMatrix,
    pub light: DayMatrix,
    pub temperature: Option<DayMatrix>,
    /// Grid slots discarded past the last complete day
    pub truncated_slots: usize,
}

impl DailyMatrix {
    pub fn total_days(&self) -> usize {
        self.activity.rows()
    }

    pub fn bins_per_day(&self) -> usize {
        self.activity.cols()
    }

    /// Calendar date of row `day`
    pub fn date(&self, day: usize) -> NaiveDate {
        self.day0 + Duration::days(day as i64)
    }

    /// Midnight at the start of row `day`
    pub fn day_start(&self, day: usize) -> NaiveDateTime {
        self.date(day).and_time(chrono::NaiveTime::MIN)
    }

    /// Calendar dates of all rows
    pub fn dates(&self) -> Vec<NaiveDate> {
        (0..self.total_days()).map(|d| self.date(d)).collect()
    }
}

/// Immutable per-run context shared by the stages after the epoch is known
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub epoch: Epoch,
    pub bins_per_day: usize,
    pub day0: NaiveDate,
    /// Effective light threshold (recording override or config value)
    pub light_threshold_lux: f64,
    pub config: PipelineConfig,
}

/// Start and mean of an extremal activity window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowExtremum {
    /// Clock time at which the window begins
    pub start: NaiveDateTime,
    /// Mean activity over the valid slots of the window
    pub mean: f64,
}

/// Scalar metrics for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    /// Sum of non-missing activity; 0 for an all-missing day
    pub total_activity: f64,
    /// Hours with light above the threshold
    pub hours_in_light: f64,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    /// Least active window
    pub l5: Option<WindowExtremum>,
    /// Most active window
    pub m10: Option<WindowExtremum>,
    /// (M10 - L5) / (M10 + L5)
    pub relative_amplitude: Option<f64>,
    pub valid_activity_slots: usize,
    /// Fraction of non-missing activity slots (0-1)
    pub activity_coverage: f64,
}

/// Whole-recording circadian statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmStats {
    /// Interdaily stability
    pub interdaily_stability: Option<f64>,
    /// Intradaily variability
    pub intradaily_variability: Option<f64>,
    /// Mean activity per hour of day across all days
    pub hourly_profile: Vec<Option<f64>>,
    /// Non-missing hourly means across the recording
    pub valid_hourly_observations: usize,
}

impl RhythmStats {
    /// Statistics for a recording too sparse to evaluate
    pub fn undefined(valid_hourly_observations: usize) -> Self {
        Self {
            interdaily_stability: None,
            intradaily_variability: None,
            hourly_profile: vec![None; HOURS_PER_DAY],
            valid_hourly_observations,
        }
    }
}

/// Day `d` followed by day `d + 1`, per channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoublePlot {
    pub activity: DayMatrix,
    pub light: DayMatrix,
    pub temperature: Option<DayMatrix>,
}

/// Per-day activity coverage against the complete-day threshold
///
/// No fallback policy is applied here; callers decide what to do when few
/// days qualify.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteDayMask {
    pub mask: Vec<bool>,
    pub valid_slots: Vec<usize>,
    /// Minimum valid slots for a day to be complete
    pub required_slots: usize,
}

impl CompleteDayMask {
    pub fn complete_days(&self) -> usize {
        self.mask.iter().filter(|&&complete| complete).count()
    }
}

/// Everything a pipeline run produces
#[derive(Debug, Clone)]
pub struct RhythmAnalysis {
    pub context: RunContext,
    pub daily: DailyMatrix,
    pub metrics: Vec<DailyMetrics>,
    pub rhythm: RhythmStats,
    pub double_plot: DoublePlot,
    pub complete_days: CompleteDayMask,
    pub dropped_rows: Vec<usize>,
    pub total_rows: usize,
    pub source: Option<String>,
}

/// Producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Provenance information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmProvenance {
    pub source: Option<String>,
    pub computed_at_utc: String,
}

/// Sampling and shape summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSummary {
    pub epoch_seconds: u32,
    pub bins_per_day: usize,
    pub total_days: usize,
    pub day0: NaiveDate,
    /// Calendar date of every row of the daily matrices
    pub day_start_dates: Vec<NaiveDate>,
    pub total_rows: usize,
    pub dropped_rows: Vec<usize>,
    pub light_threshold_lux: f64,
}

/// One day of the encoded report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayWindow {
    #[serde(flatten)]
    pub metrics: DailyMetrics,
    pub complete: bool,
}

/// Whole-recording rhythm section of the report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RhythmSummary {
    pub is: Option<f64>,
    pub iv: Option<f64>,
    pub hourly_profile: Vec<Option<f64>>,
    pub valid_hourly_observations: usize,
    pub complete_days: usize,
}

/// Matrices handed to the plotting layer
#[derive(Debug, Clone, Serialize)]
pub struct MatrixBundle {
    pub daily_activity: DayMatrix,
    pub daily_light: DayMatrix,
    pub daily_temperature: Option<DayMatrix>,
    pub double_activity: DayMatrix,
    pub double_light: DayMatrix,
    pub double_temperature: Option<DayMatrix>,
}

/// Complete encoded payload
#[derive(Debug, Clone, Serialize)]
pub struct RhythmPayload {
    pub report_version: String,
    pub producer: RhythmProducer,
    pub provenance: RhythmProvenance,
    pub sampling: SamplingSummary,
    pub days: Vec<DayWindow>,
    pub rhythm: RhythmSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrices: Option<MatrixBundle>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_rejects_non_divisors() {
        assert!(Epoch::new(60).is_some());
        assert!(Epoch::new(0).is_none());
        assert!(Epoch::new(7).is_none());
        assert_eq!(Epoch::new(90).unwrap().bins_per_day(), 960);
    }

    #[test]
    fn test_bins_for_hours() {
        let epoch = Epoch::new(60).unwrap();
        assert_eq!(epoch.bins_for_hours(5.0), 300);
        assert_eq!(epoch.bins_for_hours(10.0), 600);

        let hourly = Epoch::new(3600).unwrap();
        assert_eq!(hourly.bins_for_hours(0.1), 1);
    }

    #[test]
    fn test_day_matrix_rows() {
        let m = DayMatrix::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, MISSING, 6.0]).unwrap();
        assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
        assert_eq!(m.get(1, 0), 4.0);
        assert!(m.get(1, 1).is_nan());
        assert_eq!(m.valid_count(1), 2);
        assert_eq!(m.iter_rows().count(), 2);
        assert!(DayMatrix::new(2, 2, vec![1.0]).is_none());
    }

    #[test]
    fn test_day_matrix_serializes_missing_as_null() {
        let m = DayMatrix::new(1, 2, vec![1.5, MISSING]).unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "[[1.5,null]]");
    }

    #[test]
    fn test_raw_recording_reads_null_samples() {
        let json = r#"{
            "timestamps": ["2024-01-15 00:00", 45306.5],
            "activity": [1.0, null],
            "light": [null, 3.0]
        }"#;
        let recording: RawRecording = serde_json::from_str(json).unwrap();

        assert_eq!(recording.timestamps[1], RawTimestamp::Serial(45306.5));
        assert!(recording.activity[1].is_nan());
        assert!(recording.light[0].is_nan());
        assert!(recording.temperature.is_none());
    }
}
