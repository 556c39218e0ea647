//! Rhythm statistics
//!
//! Collapses the activity matrix to hourly means and computes the two
//! whole-recording circadian statistics:
//!
//! - **Interdaily stability (IS)**: variance of the 24-hour profile relative
//!   to total variance, `n * Σ_h (m_h - m)² / (24 * Σ_i (x_i - m)²)`. Close to 1
//!   for a rhythm that repeats exactly every day, close to 0 without one.
//! - **Intradaily variability (IV)**: mean squared successive difference of
//!   hourly means divided by their variance. Higher values mean a more
//!   fragmented rhythm.
//!
//! Hourly means are flattened day-major, so hour 23 of one day and hour 0 of
//! the next form an adjacent pair for IV. A missing hour on either side of a
//! pair removes that transition.

use crate::config::PipelineConfig;
use crate::types::{DayMatrix, Epoch, RhythmStats, HOURS_PER_DAY};
use log::{debug, warn};

/// Engine for whole-recording rhythm statistics
pub struct RhythmStatsEngine;

impl RhythmStatsEngine {
    /// Compute IS, IV and the hourly profile from the activity matrix
    pub fn compute(activity: &DayMatrix, epoch: Epoch, config: &PipelineConfig) -> RhythmStats {
        let hourly = hourly_means(activity, epoch);
        let x = hourly.as_slice();
        let valid: Vec<f64> = x.iter().copied().filter(|v| !v.is_nan()).collect();
        let profile = hour_of_day_profile(&hourly);

        if valid.len() < config.min_hourly_observations {
            warn!(
                "IS/IV undefined: {} valid hourly means, {} required",
                valid.len(),
                config.min_hourly_observations
            );
            return RhythmStats {
                hourly_profile: profile,
                ..RhythmStats::undefined(valid.len())
            };
        }

        let n = valid.len() as f64;
        let grand_mean = valid.iter().sum::<f64>() / n;
        let total_ss: f64 = valid.iter().map(|v| (v - grand_mean).powi(2)).sum();

        let interdaily_stability = interdaily_stability(&profile, grand_mean, total_ss, n);
        let intradaily_variability = intradaily_variability(x, total_ss / n, config.min_iv_pairs);

        debug!(
            "rhythm over {} hourly means: IS={:?} IV={:?}",
            valid.len(),
            interdaily_stability,
            intradaily_variability
        );

        RhythmStats {
            interdaily_stability,
            intradaily_variability,
            hourly_profile: profile,
            valid_hourly_observations: valid.len(),
        }
    }
}

/// Hour of day (0-23) covered by `bin`
pub fn hour_of_bin(bin: usize, epoch: Epoch) -> usize {
    ((bin * epoch.seconds() as usize) / 3600).min(HOURS_PER_DAY - 1)
}

/// `[days][24]` matrix of per-hour mean activity; missing where an hour has no data
pub fn hourly_means(activity: &DayMatrix, epoch: Epoch) -> DayMatrix {
    let mut hourly = DayMatrix::missing(activity.rows(), HOURS_PER_DAY);

    for (day, row) in activity.iter_rows().enumerate() {
        let mut sums = [0.0; HOURS_PER_DAY];
        let mut counts = [0usize; HOURS_PER_DAY];
        for (bin, &value) in row.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            let hour = hour_of_bin(bin, epoch);
            sums[hour] += value;
            counts[hour] += 1;
        }

        for (hour, slot) in hourly.row_mut(day).iter_mut().enumerate() {
            if counts[hour] > 0 {
                *slot = sums[hour] / counts[hour] as f64;
            }
        }
    }

    hourly
}

/// Mean of each hour-of-day column across days
fn hour_of_day_profile(hourly: &DayMatrix) -> Vec<Option<f64>> {
    (0..HOURS_PER_DAY)
        .map(|hour| {
            let (sum, count) = (0..hourly.rows())
                .map(|day| hourly.get(day, hour))
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            (count > 0).then(|| sum / count as f64)
        })
        .collect()
}

fn interdaily_stability(
    profile: &[Option<f64>],
    grand_mean: f64,
    total_ss: f64,
    n: f64,
) -> Option<f64> {
    if total_ss <= 0.0 {
        return None;
    }
    let between_ss: f64 = profile
        .iter()
        .flatten()
        .map(|m| (m - grand_mean).powi(2))
        .sum();
    Some(n * between_ss / (HOURS_PER_DAY as f64 * total_ss))
}

fn intradaily_variability(x: &[f64], variance: f64, min_pairs: usize) -> Option<f64> {
    let squared_diffs: Vec<f64> = x
        .windows(2)
        .filter(|pair| !pair[0].is_nan() && !pair[1].is_nan())
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .collect();

    if squared_diffs.len() < min_pairs || variance <= 0.0 {
        return None;
    }
    let mssd = squared_diffs.iter().sum::<f64>() / squared_diffs.len() as f64;
    Some(mssd / variance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MISSING;
    use std::f64::consts::TAU;

    fn matrix_from_fn(days: usize, epoch: Epoch, f: impl Fn(usize, usize) -> f64) -> DayMatrix {
        let bins = epoch.bins_per_day();
        let values = (0..days)
            .flat_map(|d| (0..bins).map(move |b| (d, b)))
            .map(|(d, b)| f(d, b))
            .collect();
        DayMatrix::new(days, bins, values).unwrap()
    }

    fn sinusoid(bin: usize, bins: usize) -> f64 {
        100.0 + 80.0 * (bin as f64 / bins as f64 * TAU).sin()
    }

    #[test]
    fn test_hour_of_bin() {
        let ninety = Epoch::new(90).unwrap();
        assert_eq!(hour_of_bin(0, ninety), 0);
        assert_eq!(hour_of_bin(39, ninety), 0);
        assert_eq!(hour_of_bin(40, ninety), 1);
        assert_eq!(hour_of_bin(959, ninety), 23);
    }

    #[test]
    fn test_hourly_means_skip_missing() {
        let epoch = Epoch::new(1800).unwrap();
        let m = matrix_from_fn(1, epoch, |_, b| match b {
            0 => 2.0,
            1 => 4.0,
            2 => MISSING,
            3 => 6.0,
            4 | 5 => MISSING,
            _ => 1.0,
        });
        let hourly = hourly_means(&m, epoch);

        assert_eq!(hourly.get(0, 0), 3.0);
        assert_eq!(hourly.get(0, 1), 6.0);
        assert!(hourly.get(0, 2).is_nan());
    }

    #[test]
    fn test_perfect_rhythm_has_unit_stability() {
        let epoch = Epoch::new(60).unwrap();
        let m = matrix_from_fn(3, epoch, |_, b| sinusoid(b, 1440));
        let stats = RhythmStatsEngine::compute(&m, epoch, &PipelineConfig::default());

        let is = stats.interdaily_stability.unwrap();
        assert!((is - 1.0).abs() < 1e-9, "IS = {is}");
        assert!(stats.intradaily_variability.unwrap() < 0.5);
        assert_eq!(stats.valid_hourly_observations, 72);
    }

    #[test]
    fn test_noise_has_low_stability() {
        let epoch = Epoch::new(3600).unwrap();
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut noise = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 1000) as f64
        };
        let values: Vec<f64> = (0..60 * 24).map(|_| noise()).collect();
        let m = DayMatrix::new(60, 24, values).unwrap();
        let stats = RhythmStatsEngine::compute(&m, epoch, &PipelineConfig::default());

        assert!(stats.interdaily_stability.unwrap() < 0.1);
    }

    #[test]
    fn test_alternating_hours_are_fragmented() {
        let epoch = Epoch::new(3600).unwrap();
        let alternating = matrix_from_fn(3, epoch, |_, b| (b % 2) as f64);
        let smooth = matrix_from_fn(3, epoch, |_, b| sinusoid(b, 24));
        let config = PipelineConfig::default();

        let iv_alt = RhythmStatsEngine::compute(&alternating, epoch, &config)
            .intradaily_variability
            .unwrap();
        let iv_smooth = RhythmStatsEngine::compute(&smooth, epoch, &config)
            .intradaily_variability
            .unwrap();

        // Every successive difference is 1 and the variance is 0.25
        assert!((iv_alt - 4.0).abs() < 1e-9);
        assert!(iv_alt > iv_smooth);
    }

    #[test]
    fn test_too_few_hours_is_undefined() {
        let epoch = Epoch::new(3600).unwrap();
        let m = matrix_from_fn(2, epoch, |d, b| {
            if d == 1 && b < 6 {
                MISSING
            } else {
                b as f64
            }
        });
        let stats = RhythmStatsEngine::compute(&m, epoch, &PipelineConfig::default());

        assert_eq!(stats.valid_hourly_observations, 42);
        assert!(stats.interdaily_stability.is_none());
        assert!(stats.intradaily_variability.is_none());
        assert_eq!(stats.hourly_profile[10], Some(10.0));
    }

    #[test]
    fn test_constant_activity_is_undefined() {
        let epoch = Epoch::new(3600).unwrap();
        let m = matrix_from_fn(3, epoch, |_, _| 10.0);
        let stats = RhythmStatsEngine::compute(&m, epoch, &PipelineConfig::default());

        assert!(stats.interdaily_stability.is_none());
        assert!(stats.intradaily_variability.is_none());
    }
}
