//! Epoch inference
//!
//! Determines the dominant sampling interval of a sorted series and snaps it to
//! a canonical divisor of one day, so every day holds a whole number of bins.

use crate::error::ComputeError;
use crate::types::Epoch;
use chrono::NaiveDateTime;
use log::{debug, info};

/// Canonical epochs (seconds), all divisors of 86400
pub const EPOCH_CANDIDATES: [u32; 12] = [
    60, 90, 120, 180, 300, 360, 600, 720, 900, 1200, 1800, 3600,
];

/// Smallest epoch the pipeline will use (seconds)
pub const MIN_EPOCH_SECONDS: f64 = 60.0;

/// Infers the sampling interval from timestamps
pub struct EpochInferencer;

impl EpochInferencer {
    /// Infer the epoch from sorted timestamps
    pub fn infer(timestamps: &[NaiveDateTime]) -> Result<Epoch, ComputeError> {
        let mut deltas: Vec<f64> = timestamps
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 1000.0)
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();

        if deltas.is_empty() {
            return Err(ComputeError::SamplingError(format!(
                "no positive interval between {} timestamps",
                timestamps.len()
            )));
        }

        let median = median(&mut deltas);
        let epoch = Epoch::snap(median);
        debug!(
            "median interval {:.3}s over {} deltas",
            median,
            deltas.len()
        );
        info!("inferred epoch {}s", epoch.seconds());
        Ok(epoch)
    }
}

impl Epoch {
    /// Snap a raw interval (seconds) to the nearest canonical epoch
    ///
    /// The interval is rounded to whole seconds and floored at 60 s. Ties go
    /// to the smaller candidate.
    pub fn snap(raw_seconds: f64) -> Epoch {
        let rounded = if raw_seconds.is_finite() {
            raw_seconds.round().max(MIN_EPOCH_SECONDS)
        } else {
            MIN_EPOCH_SECONDS
        };

        // min_by keeps the first of equal elements, i.e. the smaller candidate
        let snapped = EPOCH_CANDIDATES
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (f64::from(*a) - rounded).abs();
                let db = (f64::from(*b) - rounded).abs();
                da.total_cmp(&db)
            })
            .unwrap_or(Epoch::FALLBACK.seconds());

        Epoch::new(snapped).unwrap_or(Epoch::FALLBACK)
    }
}

/// Median of a non-empty slice; the mean of the middle pair for even lengths
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
