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
use serde::Serialize;
use serde_json::json;

use super::Detection;
use crate::daylight::DaylightPolicy;

/// One failed integrity check, reported in the detection details.
#[derive(Debug, Clone, Serialize)]
pub struct SensorIssue {
    pub issue: &'static str,
    pub severity: Severity,
    pub confidence: f32,
}

/// Night generation above this is a sensor fault, not rounding noise (kWh).
const NIGHT_TOLERANCE_KWH: f32 = 0.01;
/// Readings above capacity times this margin are physically impossible.
const CAPACITY_MARGIN: f32 = 1.05;
/// Trailing readings that must repeat exactly to call a sensor stuck.
const STUCK_RUN_LEN: usize = 6;
/// Trailing readings examined by the noise check.
const NOISE_WINDOW: usize = 4;
/// Coefficient of variation above which readings count as erratic.
const NOISE_CV_THRESHOLD: f32 = 1.5;

const RECOMMENDATION: &str = "Inspect the unit's metering and data link; readings from this \
                              sensor cannot be trusted until it reports plausible values again.";

/// Run the five integrity checks against one reading.
///
/// `recent` holds the energy values of the readings preceding this one in the
/// detection window, oldest first. Any failed check makes the whole reading
/// suspect, so every issue found is reported together; the result severity and
/// confidence are the maxima across them, with the first worst issue in check
/// order supplying the description.
pub fn detect_sensor_malfunction(
    energy_kwh: f32,
    panel_capacity_kw: f32,
    taken_at: DateTime<Utc>,
    recent: &[f32],
    daylight: &dyn DaylightPolicy,
    tz: Tz,
) -> Option<Detection> {
    let mut issues: Vec<SensorIssue> = Vec::new();

    if !daylight.is_daytime(taken_at, tz) && energy_kwh > NIGHT_TOLERANCE_KWH {
        issues.push(SensorIssue {
            issue: "Energy generation reported during night hours",
            severity: Severity::Critical,
            confidence: 0.98,
        });
    }

    if energy_kwh > panel_capacity_kw * CAPACITY_MARGIN {
        issues.push(SensorIssue {
            issue: "Reading exceeds physical panel capacity",
            severity: Severity::Critical,
            confidence: 0.99,
        });
    }

    if recent.len() >= STUCK_RUN_LEN && stuck_at_nonzero(&recent[recent.len() - STUCK_RUN_LEN..]) {
        issues.push(SensorIssue {
            issue: "Sensor reading stuck at same value",
            severity: Severity::High,
            confidence: 0.90,
        });
    }

    if recent.len() >= NOISE_WINDOW && erratic(&recent[recent.len() - NOISE_WINDOW..]) {
        issues.push(SensorIssue {
            issue: "Erratic sensor readings",
            severity: Severity::Medium,
            confidence: 0.75,
        });
    }

    if energy_kwh < 0.0 {
        issues.push(SensorIssue {
            issue: "Negative energy reading",
            severity: Severity::Critical,
            confidence: 1.0,
        });
    }

    if issues.is_empty() {
        return None;
    }

    let max_severity = issues.iter().map(|i| i.severity).max()?;
    let worst = issues.iter().find(|i| i.severity == max_severity)?;
    let confidence = issues.iter().map(|i| i.confidence).fold(0.0_f32, f32::max);

    Some(Detection {
        anomaly_type: AnomalyType::SensorMalfunction,
        severity: max_severity,
        confidence,
        description: format!("Sensor integrity check failed: {}", worst.issue),
        recommendation: RECOMMENDATION.to_owned(),
        details: json!({
            "issues": issues,
            "energy_kwh": energy_kwh,
            "panel_capacity_kw": panel_capacity_kw,
        }),
    })
}

/// A healthy sensor never repeats the exact same bits this many times in a
/// row; exact float equality is the point of the check.
#[expect(clippy::float_cmp)]
fn stuck_at_nonzero(tail: &[f32]) -> bool {
    let first = tail[0];
    first != 0.0 && tail.iter().all(|v| *v == first)
}

fn erratic(tail: &[f32]) -> bool {
    let n = tail.len() as f32;
    let mean = tail.iter().sum::<f32>() / n;
    if mean <= 0.0 {
        return false;
    }
    let variance = tail.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt() / mean > NOISE_CV_THRESHOLD
}
