//! Daily metrics
//!
//! Computes one [`DailyMetrics`] record per row of the daily matrix:
//! - Total activity (missing slots contribute nothing)
//! - Hours above the light threshold
//! - Temperature extrema
//! - L5 / M10 windows from NaN-aware sliding means
//! - Relative amplitude and activity coverage

use crate::types::{DailyMatrix, DailyMetrics, RunContext, WindowExtremum, MISSING};
use chrono::{Duration, NaiveDateTime};
use log::warn;

/// Which end of the sliding-mean series to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Min,
    Max,
}

/// Engine for per-day scalar metrics
pub struct DailyMetricsEngine;

impl DailyMetricsEngine {
    /// Compute metrics for every day, in row order
    pub fn compute(daily: &DailyMatrix, ctx: &RunContext) -> Vec<DailyMetrics> {
        let l5_bins = ctx.epoch.bins_for_hours(ctx.config.l5_hours);
        let m10_bins = ctx.epoch.bins_for_hours(ctx.config.m10_hours);

        (0..daily.total_days())
            .map(|day| {
                let metrics = compute_day(daily, ctx, day, l5_bins, m10_bins);
                if metrics.l5.is_none() || metrics.m10.is_none() {
                    warn!(
                        "{}: no L5/M10 window meets {:.0}% coverage",
                        metrics.date,
                        ctx.config.window_coverage * 100.0
                    );
                }
                metrics
            })
            .collect()
    }
}

fn compute_day(
    daily: &DailyMatrix,
    ctx: &RunContext,
    day: usize,
    l5_bins: usize,
    m10_bins: usize,
) -> DailyMetrics {
    let activity = daily.activity.row(day);
    let light = daily.light.row(day);
    let day_start = daily.day_start(day);

    let total_activity: f64 = activity.iter().filter(|v| !v.is_nan()).sum();
    let lit_slots = light
        .iter()
        .filter(|v| !v.is_nan() && **v > ctx.light_threshold_lux)
        .count();

    let (min_temp, max_temp) = daily
        .temperature
        .as_ref()
        .map(|t| temperature_range(t.row(day)))
        .unwrap_or((None, None));

    let window_coverage = ctx.config.window_coverage;
    let l5 = find_window(activity, l5_bins, window_coverage, Extremum::Min)
        .map(|(index, mean)| window_at(day_start, ctx, index, mean));
    let m10 = find_window(activity, m10_bins, window_coverage, Extremum::Max)
        .map(|(index, mean)| window_at(day_start, ctx, index, mean));

    let valid_activity_slots = daily.activity.valid_count(day);

    DailyMetrics {
        date: daily.date(day),
        total_activity,
        hours_in_light: lit_slots as f64 * f64::from(ctx.epoch.seconds()) / 3600.0,
        min_temp,
        max_temp,
        relative_amplitude: relative_amplitude(l5.as_ref(), m10.as_ref()),
        l5,
        m10,
        valid_activity_slots,
        activity_coverage: valid_activity_slots as f64 / activity.len() as f64,
    }
}

fn window_at(
    day_start: NaiveDateTime,
    ctx: &RunContext,
    index: usize,
    mean: f64,
) -> WindowExtremum {
    WindowExtremum {
        start: day_start + Duration::seconds(i64::from(ctx.epoch.seconds()) * index as i64),
        mean,
    }
}

/// Min and max over the non-missing values of a row
fn temperature_range(row: &[f64]) -> (Option<f64>, Option<f64>) {
    row.iter()
        .filter(|v| !v.is_nan())
        .fold((None, None), |(lo, hi): (Option<f64>, Option<f64>), &v| {
            (
                Some(lo.map_or(v, |l| l.min(v))),
                Some(hi.map_or(v, |h| h.max(v))),
            )
        })
}

fn relative_amplitude(l5: Option<&WindowExtremum>, m10: Option<&WindowExtremum>) -> Option<f64> {
    match (l5, m10) {
        (Some(l5), Some(m10)) if m10.mean + l5.mean > 0.0 => {
            Some((m10.mean - l5.mean) / (m10.mean + l5.mean))
        }
        _ => None,
    }
}

/// NaN-aware sliding mean over every window of `window` consecutive values
///
/// Position `i` averages the non-missing values in `values[i..i + window]`.
/// A window with fewer than `min_coverage * window` non-missing values is
/// itself missing. Returns `values.len() - window + 1` positions, or nothing
/// when the window does not fit.
pub fn sliding_window_means(values: &[f64], window: usize, min_coverage: f64) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    let floor = min_coverage * window as f64;

    values
        .windows(window)
        .map(|w| {
            let (sum, count) = w
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 || (count as f64) < floor {
                MISSING
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Index and value of the first minimum or maximum, skipping missing entries
pub fn first_extremum(series: &[f64], which: Extremum) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in series.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        let better = match best {
            None => true,
            Some((_, b)) => match which {
                Extremum::Min => v < b,
                Extremum::Max => v > b,
            },
        };
        if better {
            best = Some((i, v));
        }
    }
    best
}

/// Locate the extremal window of a day's activity
pub fn find_window(
    activity: &[f64],
    window: usize,
    min_coverage: f64,
    which: Extremum,
) -> Option<(usize, f64)> {
    first_extremum(&sliding_window_means(activity, window, min_coverage), which)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::types::{DayMatrix, Epoch};
    use chrono::NaiveDate;

    fn context(epoch_secs: u32, threshold: f64) -> RunContext {
        let epoch = Epoch::new(epoch_secs).unwrap();
        RunContext {
            epoch,
            bins_per_day: epoch.bins_per_day(),
            day0: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            light_threshold_lux: threshold,
            config: PipelineConfig::default(),
        }
    }

    fn daily(
        ctx: &RunContext,
        activity: Vec<f64>,
        light: Vec<f64>,
        temp: Option<Vec<f64>>,
    ) -> DailyMatrix {
        let bins = ctx.bins_per_day;
        let days = activity.len() / bins;
        DailyMatrix {
            day0: ctx.day0,
            epoch: ctx.epoch,
            activity: DayMatrix::new(days, bins, activity).unwrap(),
            light: DayMatrix::new(days, bins, light).unwrap(),
            temperature: temp.map(|t| DayMatrix::new(days, bins, t).unwrap()),
            truncated_slots: 0,
        }
    }

    #[test]
    fn test_sliding_means_respect_coverage() {
        let values = [1.0, MISSING, 3.0, 5.0, MISSING, MISSING];
        let means = sliding_window_means(&values, 2, 0.5);

        assert_eq!(means.len(), 5);
        assert_eq!(means[0], 1.0);
        assert_eq!(means[1], 3.0);
        assert_eq!(means[2], 4.0);
        assert_eq!(means[3], 5.0);
        assert!(means[4].is_nan());
    }

    #[test]
    fn test_sliding_means_window_too_long() {
        assert!(sliding_window_means(&[1.0, 2.0], 3, 0.9).is_empty());
    }

    #[test]
    fn test_first_extremum_prefers_earliest() {
        let series = [MISSING, 2.0, 1.0, 1.0, 3.0, 3.0];
        assert_eq!(first_extremum(&series, Extremum::Min), Some((2, 1.0)));
        assert_eq!(first_extremum(&series, Extremum::Max), Some((4, 3.0)));
        assert_eq!(first_extremum(&[MISSING, MISSING], Extremum::Min), None);
    }

    #[test]
    fn test_hourly_l5_m10_positions() {
        let ctx = context(3600, 5.0);
        // Quiet 01:00-06:00, busy 09:00-19:00
        let activity: Vec<f64> = (0..24)
            .map(|h| match h {
                1..=5 => 0.0,
                9..=18 => 100.0,
                _ => 20.0,
            })
            .collect();
        let d = daily(&ctx, activity, vec![0.0; 24], None);
        let metrics = DailyMetricsEngine::compute(&d, &ctx);

        let l5 = metrics[0].l5.unwrap();
        let m10 = metrics[0].m10.unwrap();
        assert_eq!(l5.start, d.day_start(0) + Duration::hours(1));
        assert_eq!(l5.mean, 0.0);
        assert_eq!(m10.start, d.day_start(0) + Duration::hours(9));
        assert_eq!(m10.mean, 100.0);
        assert_eq!(metrics[0].relative_amplitude, Some(1.0));
    }

    #[test]
    fn test_light_and_temperature() {
        let ctx = context(3600, 5.0);
        let light: Vec<f64> = (0..24)
            .map(|h| match h {
                8..=11 => 300.0,
                12 => 5.0,
                13 => MISSING,
                _ => 0.0,
            })
            .collect();
        let mut temp = vec![MISSING; 24];
        temp[3] = 31.5;
        temp[15] = 34.25;
        let d = daily(&ctx, vec![1.0; 24], light, Some(temp));
        let m = &DailyMetricsEngine::compute(&d, &ctx)[0];

        // 12:00 equals the threshold and does not count
        assert_eq!(m.hours_in_light, 4.0);
        assert_eq!(m.min_temp, Some(31.5));
        assert_eq!(m.max_temp, Some(34.25));
    }

    #[test]
    fn test_all_missing_day() {
        let ctx = context(3600, 5.0);
        let d = daily(&ctx, vec![MISSING; 24], vec![MISSING; 24], Some(vec![MISSING; 24]));
        let m = &DailyMetricsEngine::compute(&d, &ctx)[0];

        // Summation identity: an empty day totals zero rather than missing
        assert_eq!(m.total_activity, 0.0);
        assert_eq!(m.hours_in_light, 0.0);
        assert_eq!(m.min_temp, None);
        assert_eq!(m.max_temp, None);
        assert!(m.l5.is_none());
        assert!(m.m10.is_none());
        assert_eq!(m.relative_amplitude, None);
        assert_eq!(m.activity_coverage, 0.0);
    }

    #[test]
    fn test_full_coverage_bounds_daily_mean() {
        let ctx = context(300, 5.0);
        let activity: Vec<f64> = (0..288)
            .map(|i| 50.0 + 40.0 * ((i as f64) / 288.0 * std::f64::consts::TAU).sin())
            .collect();
        let mean = activity.iter().sum::<f64>() / 288.0;
        let d = daily(&ctx, activity, vec![0.0; 288], None);
        let m = &DailyMetricsEngine::compute(&d, &ctx)[0];

        assert!(m.l5.unwrap().mean <= mean);
        assert!(mean <= m.m10.unwrap().mean);
    }
}
