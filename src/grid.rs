//! Grid regularization
//!
//! Resamples the sorted series onto a contiguous fixed-step timeline spanning
//! whole calendar days. Each slot holds the mean of the raw samples whose
//! timestamp falls in `[slot_start, slot_start + epoch)`. Slots without a
//! contributing sample stay missing; nothing is interpolated.

use crate::error::ComputeError;
use crate::types::{Epoch, RegularGrid, TimeSeries, MISSING};
use chrono::{Duration, NaiveTime};
use log::debug;

/// Grid regularizer for multi-channel series
pub struct GridRegularizer;

impl GridRegularizer {
    /// Bin and average `series` onto an `epoch`-spaced grid
    ///
    /// The grid starts at midnight of the first sample's day and ends with the
    /// last slot of the last sample's day. NaN samples do not contribute to
    /// their slot for that channel.
    pub fn regularize(series: &TimeSeries, epoch: Epoch) -> Result<RegularGrid, ComputeError> {
        let (first, last) = match (series.timestamps.first(), series.timestamps.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(ComputeError::InsufficientData(
                    "cannot regularize an empty series".to_string(),
                ))
            }
        };

        let start = first.date().and_time(NaiveTime::MIN);
        let end_exclusive = last.date().and_time(NaiveTime::MIN) + Duration::days(1);
        let step_ms = i64::from(epoch.seconds()) * 1000;
        let slots = ((end_exclusive - start).num_milliseconds() / step_ms) as usize;

        let mut activity = SlotAccumulator::new(slots);
        let mut light = SlotAccumulator::new(slots);
        let mut temperature = series.temperature.as_ref().map(|_| SlotAccumulator::new(slots));

        for (i, ts) in series.timestamps.iter().enumerate() {
            let offset_ms = (*ts - start).num_milliseconds();
            if offset_ms < 0 {
                continue;
            }
            let slot = (offset_ms / step_ms) as usize;
            if slot >= slots {
                continue;
            }
            activity.add(slot, series.activity[i]);
            light.add(slot, series.light[i]);
            if let (Some(acc), Some(values)) = (temperature.as_mut(), series.temperature.as_ref()) {
                acc.add(slot, values[i]);
            }
        }

        let grid = RegularGrid {
            start,
            epoch,
            activity: activity.means(),
            light: light.means(),
            temperature: temperature.map(SlotAccumulator::means),
        };

        debug!(
            "regularized {} samples onto {} slots of {}s ({} empty activity slots)",
            series.len(),
            grid.len(),
            epoch.seconds(),
            grid.activity.iter().filter(|v| v.is_nan()).count()
        );

        Ok(grid)
    }
}

/// Running sum and count per slot
struct SlotAccumulator {
    sums: Vec<f64>,
    counts: Vec<u32>,
}

impl SlotAccumulator {
    fn new(slots: usize) -> Self {
        Self {
            sums: vec![0.0; slots],
            counts: vec![0; slots],
        }
    }

    fn add(&mut self, slot: usize, value: f64) {
        if value.is_nan() {
            return;
        }
        self.sums[slot] += value;
        self.counts[slot] += 1;
    }

    fn means(self) -> Vec<f64> {
        self.sums
            .into_iter()
            .zip(self.counts)
            .map(|(sum, count)| {
                if count == 0 {
                    MISSING
                } else {
                    sum / f64::from(count)
                }
            })
            .collect()
    }
}
