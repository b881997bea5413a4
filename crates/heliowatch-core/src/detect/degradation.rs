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

/// Degradation above this escalates severity from Medium to High (%).
const HIGH_SEVERITY_PCT: f32 = 25.0;
/// Confidence grows with degradation magnitude from this base, capped.
const BASE_CONFIDENCE: f32 = 0.6;
const CONFIDENCE_PER_PCT: f32 = 0.01;
const CONFIDENCE_CAP: f32 = 0.85;

/// Gradual efficiency loss against the unit's own historical baseline.
///
/// Returns `None` without a positive baseline; a trend conclusion needs a
/// reference point.
pub fn detect_panel_degradation(
    current_kwh: f32,
    historical_avg_kwh: f32,
    degradation_threshold_pct: f32,
) -> Option<Detection> {
    if historical_avg_kwh <= 0.0 {
        return None;
    }

    let performance_pct = current_kwh / historical_avg_kwh * 100.0;
    let degradation_pct = 100.0 - performance_pct;
    let exceeds = degradation_pct > degradation_threshold_pct;
    if !exceeds {
        return None;
    }

    let severity = if degradation_pct > HIGH_SEVERITY_PCT {
        Severity::High
    } else {
        Severity::Medium
    };
    let confidence = (BASE_CONFIDENCE + degradation_pct * CONFIDENCE_PER_PCT).min(CONFIDENCE_CAP);

    Some(Detection {
        anomaly_type: AnomalyType::Degradation,
        severity,
        confidence,
        description: format!(
            "Output at {performance_pct:.1}% of the unit's recent baseline ({degradation_pct:.1}% below normal)"
        ),
        recommendation: "Inspect the panels for soiling, shading or cell damage; clean and \
                         re-measure before replacing hardware."
            .to_owned(),
        details: json!({
            "current_kwh": current_kwh,
            "historical_avg_kwh": historical_avg_kwh,
            "performance_pct": performance_pct,
            "degradation_pct": degradation_pct,
            "threshold_pct": degradation_threshold_pct,
        }),
    })
}
