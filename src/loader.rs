//! Recording loaders
//!
//! Reads a [`RawRecording`] from CSV or JSON. Column names are matched exactly
//! (ignoring case and surrounding whitespace). Timestamp cells that parse as a
//! number are read as spreadsheet serial days, everything else as text.
//! Empty or non-numeric sample cells become missing values.

use crate::error::ComputeError;
use crate::types::{RawRecording, RawTimestamp, MISSING};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Column names to read from a CSV header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub timestamp: String,
    pub activity: String,
    pub light: String,
    /// Read when present in the header; the channel is absent otherwise
    pub temperature: Option<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            activity: "activity".to_string(),
            light: "light".to_string(),
            temperature: Some("temperature".to_string()),
        }
    }
}

/// Loader for recordings in CSV or JSON form
pub struct RecordingLoader;

impl RecordingLoader {
    /// Parse a JSON-serialized recording
    pub fn from_json(json: &str) -> Result<RawRecording, ComputeError> {
        let recording: RawRecording = serde_json::from_str(json)?;
        Ok(recording)
    }

    /// Read a CSV file
    pub fn from_csv_path(path: &Path, columns: &ColumnMap) -> Result<RawRecording, ComputeError> {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_path(path)?;
        let mut recording = read_csv(reader, columns)?;
        recording.source = Some(path.display().to_string());
        Ok(recording)
    }

    /// Read CSV from any reader
    pub fn from_csv_reader<R: Read>(
        reader: R,
        columns: &ColumnMap,
    ) -> Result<RawRecording, ComputeError> {
        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);
        read_csv(reader, columns)
    }
}

fn read_csv<R: Read>(
    mut reader: csv::Reader<R>,
    columns: &ColumnMap,
) -> Result<RawRecording, ComputeError> {
    let headers = reader.headers()?.clone();

    let ts_idx = require_column(&headers, &columns.timestamp)?;
    let activity_idx = require_column(&headers, &columns.activity)?;
    let light_idx = require_column(&headers, &columns.light)?;
    let temperature_idx = columns
        .temperature
        .as_deref()
        .and_then(|name| find_column(&headers, name));

    let mut recording = RawRecording {
        timestamps: Vec::new(),
        activity: Vec::new(),
        light: Vec::new(),
        temperature: temperature_idx.map(|_| Vec::new()),
        light_threshold_lux: None,
        source: None,
    };

    for record in reader.records() {
        let record = record?;
        recording
            .timestamps
            .push(timestamp_cell(record.get(ts_idx).unwrap_or("")));
        recording
            .activity
            .push(sample_cell(record.get(activity_idx)));
        recording.light.push(sample_cell(record.get(light_idx)));
        if let (Some(idx), Some(temps)) = (temperature_idx, recording.temperature.as_mut()) {
            temps.push(sample_cell(record.get(idx)));
        }
    }

    debug!(
        "loaded {} csv rows (temperature {})",
        recording.timestamps.len(),
        if recording.temperature.is_some() {
            "present"
        } else {
            "absent"
        }
    );
    Ok(recording)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    let wanted = name.trim();
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(wanted))
}

fn require_column(headers: &StringRecord, name: &str) -> Result<usize, ComputeError> {
    find_column(headers, name).ok_or_else(|| {
        ComputeError::ConfigurationError(format!(
            "missing required column '{}' (found: {})",
            name,
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })
}

fn timestamp_cell(cell: &str) -> RawTimestamp {
    match cell.parse::<f64>() {
        Ok(serial) => RawTimestamp::Serial(serial),
        Err(_) => RawTimestamp::Text(cell.to_string()),
    }
}

fn sample_cell(cell: Option<&str>) -> f64 {
    cell.and_then(|c| c.parse::<f64>().ok()).unwrap_or(MISSING)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Timestamp, Activity ,Light,Temperature
15/01/2024 10:00,12,300.5,33.1
15/01/2024 10:01,,0,
45306.5,7,NaN,33.4
";

    #[test]
    fn test_reads_named_columns() {
        let rec = RecordingLoader::from_csv_reader(CSV.as_bytes(), &ColumnMap::default()).unwrap();

        assert_eq!(rec.timestamps.len(), 3);
        assert_eq!(rec.timestamps[0], RawTimestamp::Text("15/01/2024 10:00".to_string()));
        assert_eq!(rec.timestamps[2], RawTimestamp::Serial(45306.5));
        assert_eq!(rec.activity[0], 12.0);
        assert!(rec.activity[1].is_nan());
        assert!(rec.light[2].is_nan());
        let temps = rec.temperature.unwrap();
        assert!(temps[1].is_nan());
        assert_eq!(temps[2], 33.4);
    }

    #[test]
    fn test_optional_temperature_absent() {
        let csv = "timestamp,activity,light\n2024-01-15 10:00,1,2\n";
        let rec = RecordingLoader::from_csv_reader(csv.as_bytes(), &ColumnMap::default()).unwrap();
        assert!(rec.temperature.is_none());
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "timestamp,counts,light\n2024-01-15 10:00,1,2\n";
        let result = RecordingLoader::from_csv_reader(csv.as_bytes(), &ColumnMap::default());
        assert!(matches!(result, Err(ComputeError::ConfigurationError(_))));
    }

    #[test]
    fn test_custom_column_names() {
        let csv = "time,counts,lux\n2024-01-15 10:00,1,2\n";
        let columns = ColumnMap {
            timestamp: "time".to_string(),
            activity: "counts".to_string(),
            light: "lux".to_string(),
            temperature: None,
        };
        let rec = RecordingLoader::from_csv_reader(csv.as_bytes(), &columns).unwrap();
        assert_eq!(rec.activity, vec![1.0]);
        assert_eq!(rec.light, vec![2.0]);
    }
}
