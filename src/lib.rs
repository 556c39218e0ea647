//! Synheart Rhythm - Actigraphy regularization and circadian rhythm metrics
//!
//! Rhythm turns an irregularly sampled wrist recording (activity, light and
//! optional skin temperature) into per-day metrics and whole-recording rhythm
//! statistics through a deterministic pipeline: timestamp normalization →
//! epoch inference → grid regularization → daily binning → metrics, rhythm
//! statistics and 48-hour views → report encoding.
//!
//! ## Modules
//!
//! - **Ingestion**: [`loader`] reads CSV or JSON, [`timestamp`] parses and sorts
//! - **Sampling**: [`epoch`], [`grid`] and [`binner`] build the daily matrix
//! - **Metrics**: [`metrics`] (L5/M10, light, temperature) and [`rhythm`] (IS/IV)
//! - **Views**: [`double_plot`] builds double-plotted matrices and the complete-day mask

pub mod binner;
pub mod config;
pub mod double_plot;
pub mod encoder;
pub mod epoch;
pub mod error;
pub mod grid;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod rhythm;
pub mod timestamp;
pub mod types;

pub use config::PipelineConfig;
pub use encoder::{ReportEncoder, REPORT_VERSION};
pub use error::ComputeError;
pub use loader::{ColumnMap, RecordingLoader};
pub use pipeline::{analyze_recording, RhythmProcessor};
pub use types::{RawRecording, RawTimestamp, RhythmAnalysis, RhythmPayload};

/// Rhythm version embedded in all report payloads
pub const RHYTHM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report payloads
pub const PRODUCER_NAME: &str = "synheart-rhythm";
