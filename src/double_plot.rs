//! 48-hour (double-plotted) views
//!
//! Row `d` of a double plot holds day `d` followed by day `d + 1`. The second
//! half of the last row is entirely missing. Also derives the complete-day
//! mask from activity coverage.

use crate::config::PipelineConfig;
use crate::types::{CompleteDayMask, DailyMatrix, DayMatrix, DoublePlot};

/// Builder for double-plotted matrices
pub struct DoublePlotBuilder;

impl DoublePlotBuilder {
    /// Build the 48-hour matrices for every channel
    pub fn build(daily: &DailyMatrix) -> DoublePlot {
        DoublePlot {
            activity: double_rows(&daily.activity),
            light: double_rows(&daily.light),
            temperature: daily.temperature.as_ref().map(double_rows),
        }
    }

    /// Flag days whose activity coverage reaches the configured fraction
    pub fn complete_days(daily: &DailyMatrix, config: &PipelineConfig) -> CompleteDayMask {
        let bins = daily.bins_per_day();
        let required_slots = (config.complete_day_coverage * bins as f64).ceil() as usize;

        let valid_slots: Vec<usize> = (0..daily.total_days())
            .map(|day| daily.activity.valid_count(day))
            .collect();
        let mask = valid_slots.iter().map(|&n| n >= required_slots).collect();

        CompleteDayMask {
            mask,
            valid_slots,
            required_slots,
        }
    }
}

/// `[days][2 * bins]` matrix pairing each day with the next
pub fn double_rows(matrix: &DayMatrix) -> DayMatrix {
    let days = matrix.rows();
    let bins = matrix.cols();
    let mut doubled = DayMatrix::missing(days, 2 * bins);

    for day in 0..days {
        let row = doubled.row_mut(day);
        row[..bins].copy_from_slice(matrix.row(day));
        if day + 1 < days {
            row[bins..].copy_from_slice(matrix.row(day + 1));
        }
    }
    doubled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Epoch, MISSING};
    use chrono::NaiveDate;

    fn daily(activity: Vec<f64>) -> DailyMatrix {
        let epoch = Epoch::new(3600).unwrap();
        let days = activity.len() / 24;
        DailyMatrix {
            day0: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            epoch,
            light: DayMatrix::new(days, 24, vec![0.0; activity.len()]).unwrap(),
            activity: DayMatrix::new(days, 24, activity).unwrap(),
            temperature: None,
            truncated_slots: 0,
        }
    }

    #[test]
    fn test_rows_pair_consecutive_days() {
        let values: Vec<f64> = (0..72).map(|i| i as f64).collect();
        let plot = DoublePlotBuilder::build(&daily(values));

        assert_eq!(plot.activity.rows(), 3);
        assert_eq!(plot.activity.cols(), 48);
        assert_eq!(plot.activity.get(0, 0), 0.0);
        assert_eq!(plot.activity.get(0, 24), 24.0);
        assert_eq!(plot.activity.get(1, 47), 71.0);
        assert!(plot.activity.row(2)[24..].iter().all(|v| v.is_nan()));
        assert!(plot.temperature.is_none());
    }

    #[test]
    fn test_missing_slots_stay_missing() {
        let mut values = vec![1.0; 48];
        values[30] = MISSING;
        let plot = DoublePlotBuilder::build(&daily(values));

        assert!(plot.activity.get(0, 30).is_nan());
        assert!(plot.activity.get(1, 6).is_nan());
    }

    #[test]
    fn test_complete_day_mask() {
        let mut values = vec![1.0; 72];
        // Day 1 loses two of 24 hours: 22 < ceil(0.95 * 24) = 23
        values[24] = MISSING;
        values[25] = MISSING;
        // Day 2 loses one hour: 23 >= 23
        values[48] = MISSING;

        let mask = DoublePlotBuilder::complete_days(&daily(values), &PipelineConfig::default());

        assert_eq!(mask.required_slots, 23);
        assert_eq!(mask.valid_slots, vec![24, 22, 23]);
        assert_eq!(mask.mask, vec![true, false, true]);
        assert_eq!(mask.complete_days(), 2);
    }
}
