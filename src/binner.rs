//! Daily binning
//!
//! Reshapes the regular grid into one row per complete calendar day. Trailing
//! slots beyond the last whole day are discarded (floor, never round).

use crate::error::ComputeError;
use crate::types::{DailyMatrix, DayMatrix, RegularGrid};
use log::{debug, warn};

/// Daily binner for regular grids
pub struct DailyBinner;

impl DailyBinner {
    /// Split every channel of `grid` into `[total_days][bins_per_day]`
    pub fn bin(grid: &RegularGrid) -> Result<DailyMatrix, ComputeError> {
        let bins = grid.epoch.bins_per_day();
        let total_days = grid.len() / bins;

        if total_days < 1 {
            return Err(ComputeError::InsufficientData(format!(
                "grid of {} slots holds no complete day of {} bins",
                grid.len(),
                bins
            )));
        }

        let kept = total_days * bins;
        let truncated_slots = grid.len() - kept;
        if truncated_slots > 0 {
            warn!("discarding {truncated_slots} slots of a partial final day");
        }

        let reshape = |channel: &[f64]| -> Result<DayMatrix, ComputeError> {
            DayMatrix::new(total_days, bins, channel[..kept].to_vec()).ok_or_else(|| {
                ComputeError::InsufficientData("channel shorter than the time axis".to_string())
            })
        };

        let daily = DailyMatrix {
            day0: grid.start.date(),
            epoch: grid.epoch,
            activity: reshape(&grid.activity)?,
            light: reshape(&grid.light)?,
            temperature: grid.temperature.as_deref().map(reshape).transpose()?,
            truncated_slots,
        };

        debug!(
            "binned {} days of {} bins starting {}",
            total_days, bins, daily.day0
        );
        Ok(daily)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Epoch, MISSING};
    use chrono::NaiveDate;

    fn grid(epoch_secs: u32, len: usize) -> RegularGrid {
        RegularGrid {
            start: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            epoch: Epoch::new(epoch_secs).unwrap(),
            activity: (0..len).map(|i| i as f64).collect(),
            light: vec![MISSING; len],
            temperature: Some(vec![36.0; len]),
        }
    }

    #[test]
    fn test_rows_map_to_calendar_days() {
        let daily = DailyBinner::bin(&grid(3600, 72)).unwrap();

        assert_eq!(daily.total_days(), 3);
        assert_eq!(daily.bins_per_day(), 24);
        assert_eq!(daily.activity.get(1, 0), 24.0);
        assert_eq!(daily.date(2), NaiveDate::from_ymd_opt(2024, 1, 17).unwrap());
        assert_eq!(daily.temperature.as_ref().unwrap().rows(), 3);
    }

    #[test]
    fn test_partial_day_is_truncated() {
        let daily = DailyBinner::bin(&grid(3600, 24 * 2 + 23)).unwrap();

        assert_eq!(daily.total_days(), 2);
        assert_eq!(daily.truncated_slots, 23);
    }

    #[test]
    fn test_missing_slots_survive_binning() {
        let daily = DailyBinner::bin(&grid(3600, 24)).unwrap();
        assert!(daily.light.row(0).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_no_complete_day_fails() {
        let result = DailyBinner::bin(&grid(3600, 23));
        assert!(matches!(result, Err(ComputeError::InsufficientData(_))));
    }
}
