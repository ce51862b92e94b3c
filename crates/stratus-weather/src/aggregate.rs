//! Forecast aggregation: hourly window and daily summaries.
//!
//! Both views are derived from the same cached 3-hour forecast series and
//! recomputed on every call.

use crate::types::{DailySummary, ForecastSample};

/// Samples shown in the hourly view.
pub const DEFAULT_HOURLY_WINDOW: usize = 24;

/// Maximum number of days in the daily view.
pub const DEFAULT_DAILY_DAYS: usize = 7;

/// The first `len` samples, unchanged.
pub fn hourly_window(samples: &[ForecastSample], len: usize) -> &[ForecastSample] {
    &samples[..samples.len().min(len)]
}

/// Collapse a forecast series into at most `max_days` daily summaries.
///
/// Samples are grouped by the date part of their date string. Groups keep
/// the order in which their first sample arrived; samples are never sorted,
/// so out-of-order input yields out-of-order days.
///
/// For each day the sample at index `len / 2` is the representative. Its
/// `temp` is replaced by the mean of the day's temps, `temp_min` by the
/// lowest `temp_min`, and `temp_max` by the highest `temp_max`. Every other
/// field (description, icon, wind, ...) comes from the representative.
pub fn daily_summaries(samples: &[ForecastSample], max_days: usize) -> Vec<DailySummary> {
    let mut days: Vec<(&str, Vec<&ForecastSample>)> = Vec::new();

    for sample in samples {
        let day = sample.day();
        match days.iter().position(|(d, _)| *d == day) {
            Some(i) => days[i].1.push(sample),
            None => days.push((day, vec![sample])),
        }
    }

    days.into_iter()
        .take(max_days)
        .map(|(day, group)| summarize(day, &group))
        .collect()
}

fn summarize(day: &str, group: &[&ForecastSample]) -> DailySummary {
    let mut representative = group[group.len() / 2].sample.clone();

    let count = group.len() as f64;
    representative.temp = group.iter().map(|s| s.sample.temp).sum::<f64>() / count;
    representative.temp_min = group
        .iter()
        .map(|s| s.sample.temp_min)
        .fold(f64::INFINITY, f64::min);
    representative.temp_max = group
        .iter()
        .map(|s| s.sample.temp_max)
        .fold(f64::NEG_INFINITY, f64::max);

    DailySummary {
        date: day.to_string(),
        representative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherSample;

    fn sample(date: &str, temp: f64, temp_min: f64, temp_max: f64, description: &str) -> ForecastSample {
        ForecastSample {
            sample: WeatherSample {
                city: "Paris".to_string(),
                country: "FR".to_string(),
                temp,
                feels_like: temp,
                temp_min,
                temp_max,
                humidity: 70,
                pressure: 1012,
                wind_speed: 3.5,
                wind_deg: 220,
                condition_code: 803,
                condition_group: "Clouds".to_string(),
                icon: "04d".to_string(),
                description: description.to_string(),
                dt: 0,
                pop: Some(0.1),
                rain: None,
                coordinates: None,
            },
            date: date.to_string(),
        }
    }

    /// 3-hour samples for `days` consecutive days starting 2024-05-01.
    fn series(days: u32, temp_for: impl Fn(u32, u32) -> f64) -> Vec<ForecastSample> {
        let mut out = Vec::new();
        for d in 0..days {
            for slot in 0..8 {
                let t = temp_for(d, slot);
                out.push(sample(
                    &format!("2024-05-{:02} {:02}:00:00", d + 1, slot * 3),
                    t,
                    t - 1.0,
                    t + 1.0,
                    &format!("day {} slot {}", d, slot),
                ));
            }
        }
        out
    }

    #[test]
    fn test_empty_input_yields_no_days() {
        assert!(daily_summaries(&[], DEFAULT_DAILY_DAYS).is_empty());
    }

    #[test]
    fn test_five_day_series() {
        let input = series(5, |d, slot| d as f64 * 10.0 + slot as f64);
        let days = daily_summaries(&input, DEFAULT_DAILY_DAYS);

        assert_eq!(days.len(), 5);
        for (d, day) in days.iter().enumerate() {
            let base = d as f64 * 10.0;
            assert_eq!(day.date, format!("2024-05-{:02}", d + 1));
            // mean of base+0..=base+7
            assert_eq!(day.temp(), base + 3.5);
            assert_eq!(day.temp_min(), base - 1.0);
            assert_eq!(day.temp_max(), base + 8.0);
        }
    }

    #[test]
    fn test_representative_is_middle_sample() {
        let input = series(1, |_, slot| slot as f64);
        let days = daily_summaries(&input, DEFAULT_DAILY_DAYS);

        // 8 samples -> index 4
        assert_eq!(days[0].representative.description, "day 0 slot 4");
    }

    #[test]
    fn test_single_sample_day() {
        let input = vec![sample("2024-05-01 21:00:00", 12.0, 11.0, 13.0, "only")];
        let days = daily_summaries(&input, DEFAULT_DAILY_DAYS);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].temp(), 12.0);
        assert_eq!(days[0].temp_min(), 11.0);
        assert_eq!(days[0].temp_max(), 13.0);
        assert_eq!(days[0].representative.description, "only");
    }

    #[test]
    fn test_truncates_to_max_days_without_padding() {
        let input = series(9, |_, _| 5.0);
        assert_eq!(daily_summaries(&input, DEFAULT_DAILY_DAYS).len(), 7);
        assert_eq!(daily_summaries(&input[..16], DEFAULT_DAILY_DAYS).len(), 2);
    }

    #[test]
    fn test_groups_follow_arrival_order() {
        let input = vec![
            sample("2024-05-02 00:00:00", 20.0, 20.0, 20.0, "b"),
            sample("2024-05-01 21:00:00", 10.0, 10.0, 10.0, "a"),
            sample("2024-05-02 03:00:00", 22.0, 22.0, 22.0, "b"),
        ];
        let days = daily_summaries(&input, DEFAULT_DAILY_DAYS);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].date, "2024-05-02");
        assert_eq!(days[0].temp(), 21.0);
        assert_eq!(days[1].date, "2024-05-01");
    }

    #[test]
    fn test_mean_can_fall_outside_min_max() {
        // Per-sample extremes are narrower than the temps themselves.
        let input = vec![
            sample("2024-05-01 00:00:00", 30.0, 10.0, 12.0, "x"),
            sample("2024-05-01 03:00:00", 30.0, 10.0, 12.0, "y"),
        ];
        let day = &daily_summaries(&input, DEFAULT_DAILY_DAYS)[0];

        assert_eq!(day.temp(), 30.0);
        assert!(day.temp() > day.temp_max());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let input = series(4, |d, slot| (d * slot) as f64 * 0.7 - 3.0);
        assert_eq!(
            daily_summaries(&input, DEFAULT_DAILY_DAYS),
            daily_summaries(&input, DEFAULT_DAILY_DAYS)
        );
    }

    #[test]
    fn test_iso_dates_group_by_day() {
        let input = vec![
            sample("2024-05-01T00:00:00Z", 1.0, 1.0, 1.0, "a"),
            sample("2024-05-01T03:00:00Z", 3.0, 3.0, 3.0, "b"),
        ];
        let days = daily_summaries(&input, DEFAULT_DAILY_DAYS);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, "2024-05-01");
    }

    #[test]
    fn test_hourly_window_is_pass_through() {
        let input = series(5, |_, slot| slot as f64);
        let window = hourly_window(&input, DEFAULT_HOURLY_WINDOW);

        assert_eq!(window.len(), 24);
        assert_eq!(window, &input[..24]);
        assert_eq!(hourly_window(&input[..3], DEFAULT_HOURLY_WINDOW).len(), 3);
    }
}
