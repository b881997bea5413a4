// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of HelioWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use heliowatch_types::GenerationReading;

/// One local calendar day's readings for one unit.
/// Built per detection run and discarded after persistence.
#[derive(Debug, Clone)]
pub struct DailyBucket {
    /// Calendar date in the unit's local timezone
    pub date: NaiveDate,
    pub total_energy_kwh: f32,
    pub avg_cloud_coverage_pct: f32,
    pub avg_precipitation_mm: f32,
    /// Source readings, oldest first
    pub readings: Vec<GenerationReading>,
}

/// Group readings into per-day buckets by the local calendar date of
/// `taken_at`. Buckets come back oldest first, readings within each bucket
/// oldest first. Days without readings produce no bucket.
pub fn bucket_readings_by_local_day(readings: &[GenerationReading], tz: Tz) -> Vec<DailyBucket> {
    let mut by_day: BTreeMap<NaiveDate, Vec<GenerationReading>> = BTreeMap::new();
    for reading in readings {
        let date = reading.taken_at.with_timezone(&tz).date_naive();
        by_day.entry(date).or_default().push(reading.clone());
    }

    by_day
        .into_iter()
        .map(|(date, mut day_readings)| {
            day_readings.sort_by_key(|r| r.taken_at);
            let n = day_readings.len() as f32;
            DailyBucket {
                date,
                total_energy_kwh: day_readings.iter().map(|r| r.energy_kwh).sum(),
                avg_cloud_coverage_pct: day_readings
                    .iter()
                    .map(|r| r.cloud_coverage_pct)
                    .sum::<f32>()
                    / n,
                avg_precipitation_mm: day_readings
                    .iter()
                    .map(|r| r.precipitation_mm)
                    .sum::<f32>()
                    / n,
                readings: day_readings,
            }
        })
        .collect()
}

/// Mean daily generation over the days in `readings` that have any data.
/// Returns 0.0 for an empty slice, which downstream detectors treat as
/// "no baseline available".
pub fn baseline_daily_average(readings: &[GenerationReading], tz: Tz) -> f32 {
    let buckets = bucket_readings_by_local_day(readings, tz);
    if buckets.is_empty() {
        return 0.0;
    }
    buckets.iter().map(|b| b.total_energy_kwh).sum::<f32>() / buckets.len() as f32
}

/// UTC bounds of one local calendar day: midnight to the next midnight,
/// half-open.
pub fn local_day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        local_midnight(date, tz),
        local_midnight(date.succ_opt().unwrap_or(date), tz),
    )
}

fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    // Midnight can be doubled or skipped on DST transition days; take the
    // earliest valid instant, or fall back to naive UTC.
    let naive = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&naive), |dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]

    use super::*;
    use chrono::TimeZone;

    fn make_reading(taken_at: DateTime<Utc>, energy: f32, cloud: f32, precip: f32) -> GenerationReading {
        GenerationReading {
            unit_id: "unit-1".to_owned(),
            energy_kwh: energy,
            taken_at,
            cloud_coverage_pct: cloud,
            temperature_c: 20.0,
            precipitation_mm: precip,
        }
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_groups_by_local_day() {
        // 22:30 UTC on June 14 is 00:30 June 15 in Prague
        let readings = vec![
            make_reading(at(2025, 6, 14, 22, 30), 0.0, 0.0, 0.0),
            make_reading(at(2025, 6, 15, 10, 0), 2.5, 10.0, 0.0),
        ];

        let prague = bucket_readings_by_local_day(&readings, chrono_tz::Europe::Prague);
        assert_eq!(prague.len(), 1);
        assert_eq!(
            prague[0].date,
            NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
        );
        assert_eq!(prague[0].readings.len(), 2);

        let utc = bucket_readings_by_local_day(&readings, Tz::UTC);
        assert_eq!(utc.len(), 2);
    }

    #[test]
    fn test_bucket_totals_and_averages() {
        let readings = vec![
            make_reading(at(2025, 6, 15, 8, 0), 1.0, 10.0, 0.0),
            make_reading(at(2025, 6, 15, 12, 0), 2.0, 20.0, 1.0),
            make_reading(at(2025, 6, 15, 16, 0), 3.0, 30.0, 2.0),
        ];

        let buckets = bucket_readings_by_local_day(&readings, Tz::UTC);
        assert_eq!(buckets.len(), 1);
        assert!((buckets[0].total_energy_kwh - 6.0).abs() < 0.001);
        assert!((buckets[0].avg_cloud_coverage_pct - 20.0).abs() < 0.001);
        assert!((buckets[0].avg_precipitation_mm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_buckets_and_readings_come_back_sorted() {
        let readings = vec![
            make_reading(at(2025, 6, 16, 12, 0), 2.0, 0.0, 0.0),
            make_reading(at(2025, 6, 15, 14, 0), 1.5, 0.0, 0.0),
            make_reading(at(2025, 6, 15, 9, 0), 1.0, 0.0, 0.0),
        ];

        let buckets = bucket_readings_by_local_day(&readings, Tz::UTC);
        assert_eq!(buckets.len(), 2);
        assert!(buckets[0].date < buckets[1].date);
        assert!(buckets[0].readings[0].taken_at < buckets[0].readings[1].taken_at);
    }

    #[test]
    fn test_baseline_daily_average() {
        let readings = vec![
            make_reading(at(2025, 6, 10, 10, 0), 3.0, 0.0, 0.0),
            make_reading(at(2025, 6, 10, 14, 0), 5.0, 0.0, 0.0),
            make_reading(at(2025, 6, 11, 12, 0), 10.0, 0.0, 0.0),
            make_reading(at(2025, 6, 13, 12, 0), 12.0, 0.0, 0.0),
        ];

        // Daily totals 8, 10, 12; June 12 has no data and is not counted
        let baseline = baseline_daily_average(&readings, Tz::UTC);
        assert!((baseline - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_baseline_empty_is_zero() {
        assert_eq!(baseline_daily_average(&[], Tz::UTC), 0.0);
    }

    #[test]
    fn test_local_day_bounds_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (start, end) = local_day_bounds(date, Tz::UTC);
        assert_eq!(start, at(2025, 6, 15, 0, 0));
        assert_eq!(end, at(2025, 6, 16, 0, 0));
    }

    #[test]
    fn test_local_day_bounds_prague_summer() {
        // Prague midnight in June is 22:00 UTC the previous day
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let (start, end) = local_day_bounds(date, chrono_tz::Europe::Prague);
        assert_eq!(start, at(2025, 6, 14, 22, 0));
        assert_eq!(end, at(2025, 6, 15, 22, 0));
    }
}
