//! Error types for Synheart Rhythm

use thiserror::Error;

/// Errors that abort a pipeline run
///
/// Per-day or per-metric sparsity is never an error; it is expressed as
/// missing values in the output instead.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Too few parseable timestamps: {valid} valid, at least {required} required")]
    ParseError { valid: usize, required: usize },

    #[error("Cannot infer sampling interval: {0}")]
    SamplingError(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl ComputeError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ComputeError::ParseError { .. } => "PARSE_ERROR",
            ComputeError::SamplingError(_) => "SAMPLING_ERROR",
            ComputeError::InsufficientData(_) => "INSUFFICIENT_DATA",
            ComputeError::ConfigurationError(_) => "CONFIGURATION_ERROR",
            ComputeError::JsonError(_) => "JSON_ERROR",
            ComputeError::CsvError(_) => "CSV_ERROR",
            ComputeError::EncodingError(_) => "ENCODING_ERROR",
        }
    }
}
