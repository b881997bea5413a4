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

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use heliowatch_types::{AnomalyType, Severity};
use serde_json::json;

use super::Detection;
use crate::daylight::DaylightPolicy;

/// Output below this share of rated capacity counts as no generation (%).
const FAILURE_CAPACITY_PCT: f32 = 0.5;
/// At or above this cloud cover, near-zero output is still explainable (%).
const HEAVY_CLOUD_PCT: f32 = 90.0;

/// Total generation loss during conditions where output is expected.
///
/// Near-zero production at night is normal, and under near-total cloud cover
/// it is plausible; in daylight under workable skies it means the unit is
/// down.
pub fn detect_complete_failure(
    energy_kwh: f32,
    panel_capacity_kw: f32,
    at: DateTime<Utc>,
    cloud_coverage_pct: f32,
    daylight: &dyn DaylightPolicy,
    tz: Tz,
) -> Option<Detection> {
    if !daylight.is_daytime(at, tz) {
        return None;
    }

    let capacity_pct = energy_kwh / panel_capacity_kw * 100.0;
    let fires = capacity_pct < FAILURE_CAPACITY_PCT && cloud_coverage_pct < HEAVY_CLOUD_PCT;
    if !fires {
        return None;
    }

    Some(Detection {
        anomaly_type: AnomalyType::CompleteFailure,
        severity: Severity::Critical,
        confidence: 0.95,
        description: format!(
            "Unit produced {energy_kwh:.2} kWh ({capacity_pct:.2}% of rated capacity) in daylight with {cloud_coverage_pct:.0}% cloud cover"
        ),
        recommendation: "Check the inverter, wiring and breakers; the unit is effectively not \
                         producing despite workable conditions."
            .to_owned(),
        details: json!({
            "energy_kwh": energy_kwh,
            "panel_capacity_kw": panel_capacity_kw,
            "capacity_pct": capacity_pct,
            "cloud_coverage_pct": cloud_coverage_pct,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daylight::FixedWindowDaylight;
    use chrono::TimeZone;

    fn check(energy: f32, capacity: f32, hour: u32, cloud: f32) -> Option<Detection> {
        detect_complete_failure(
            energy,
            capacity,
            Utc.with_ymd_and_hms(2025, 6, 15, hour, 0, 0).unwrap(),
            cloud,
            &FixedWindowDaylight::default(),
            Tz::UTC,
        )
    }

    #[test]
    fn test_near_zero_daytime_output_fires() {
        // 0.02 kWh from a 5 kW array at 14:00 with 25% cloud
        let detection = check(0.02, 5.0, 14, 25.0).unwrap();
        assert_eq!(detection.anomaly_type, AnomalyType::CompleteFailure);
        assert_eq!(detection.severity, Severity::Critical);
        assert!((detection.confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_no_output_at_night_is_expected() {
        assert!(check(0.0, 5.0, 22, 10.0).is_none());
    }

    #[test]
    fn test_heavy_cloud_explains_near_zero_output() {
        assert!(check(0.02, 5.0, 14, 95.0).is_none());
        // Boundary: exactly 90% cloud still counts as heavy
        assert!(check(0.02, 5.0, 14, 90.0).is_none());
        assert!(check(0.02, 5.0, 14, 89.9).is_some());
    }

    #[test]
    fn test_modest_output_does_not_fire() {
        // 1% of capacity is low but not a complete failure
        assert!(check(0.05, 5.0, 14, 25.0).is_none());
    }
}
