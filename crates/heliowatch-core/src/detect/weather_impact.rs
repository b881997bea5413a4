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

use heliowatch_types::{AnomalyType, Severity};
use serde_json::json;

use super::Detection;

/// Cloud cover contributes up to 0.7 of the severity scale.
const CLOUD_WEIGHT: f32 = 0.7;
/// Precipitation contributes 0.2 per mm, capped at 0.8.
const PRECIP_RATE: f32 = 0.2;
const PRECIP_CAP: f32 = 0.8;
/// Weather alone never explains a full 100% loss.
const SEVERITY_CAP: f32 = 0.9;
/// Severity at or below this is too mild to attribute anything to weather.
const SEVERITY_GATE: f32 = 0.4;
/// Tolerance band (percentage points) absorbing noise around the model.
const REDUCTION_TOLERANCE_PCT: f32 = 20.0;

/// Combined 0-1 estimate of how hard current weather suppresses generation.
pub fn weather_severity(cloud_coverage_pct: f32, precipitation_mm: f32) -> f32 {
    (cloud_coverage_pct / 100.0 * CLOUD_WEIGHT + (precipitation_mm * PRECIP_RATE).min(PRECIP_CAP))
        .min(SEVERITY_CAP)
}

/// Separate weather-caused from panel-caused low output.
///
/// The reduction the weather model predicts is compared with the reduction
/// actually observed against `expected_kwh`. Output within the tolerance band
/// is weather doing what weather does; a shortfall well beyond what weather
/// explains points at the panels on top of the weather. Producing more than
/// the model predicts is never a fault.
pub fn classify_weather_impact(
    energy_kwh: f32,
    expected_kwh: f32,
    cloud_coverage_pct: f32,
    precipitation_mm: f32,
) -> Option<Detection> {
    let severity = weather_severity(cloud_coverage_pct, precipitation_mm);
    let significant = severity > SEVERITY_GATE;
    if !significant {
        return None;
    }

    let expected_reduction_pct = severity * 100.0;
    let actual_reduction_pct = if expected_kwh > 0.0 {
        (expected_kwh - energy_kwh) / expected_kwh * 100.0
    } else {
        0.0
    };
    let excess = actual_reduction_pct - expected_reduction_pct;

    if excess.abs() < REDUCTION_TOLERANCE_PCT {
        return Some(Detection {
            anomaly_type: AnomalyType::WeatherRelated,
            severity: Severity::Low,
            confidence: 0.8,
            description: format!(
                "Output down {actual_reduction_pct:.1}%, in line with the {expected_reduction_pct:.0}% expected from current weather"
            ),
            recommendation: "No intervention needed; production should recover with the weather."
                .to_owned(),
            details: details(
                severity,
                expected_reduction_pct,
                actual_reduction_pct,
                cloud_coverage_pct,
                precipitation_mm,
                false,
            ),
        });
    }

    if excess > REDUCTION_TOLERANCE_PCT {
        return Some(Detection {
            anomaly_type: AnomalyType::WeatherRelated,
            severity: Severity::Medium,
            confidence: 0.7,
            description: format!(
                "Output down {actual_reduction_pct:.1}% but current weather only explains about {expected_reduction_pct:.0}%"
            ),
            recommendation: "Schedule an inspection; the shortfall exceeds what the weather \
                             model allows for."
                .to_owned(),
            details: details(
                severity,
                expected_reduction_pct,
                actual_reduction_pct,
                cloud_coverage_pct,
                precipitation_mm,
                true,
            ),
        });
    }

    None
}

fn details(
    severity: f32,
    expected_reduction_pct: f32,
    actual_reduction_pct: f32,
    cloud_coverage_pct: f32,
    precipitation_mm: f32,
    is_panel_issue: bool,
) -> serde_json::Value {
    json!({
        "weather_severity": severity,
        "expected_reduction_pct": expected_reduction_pct,
        "actual_reduction_pct": actual_reduction_pct,
        "cloud_coverage_pct": cloud_coverage_pct,
        "precipitation_mm": precipitation_mm,
        "is_panel_issue": is_panel_issue,
    })
}
