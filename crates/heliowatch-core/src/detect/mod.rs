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

mod complete_failure;
mod degradation;
mod sensor_integrity;
mod weather_impact;

pub use complete_failure::detect_complete_failure;
pub use degradation::detect_panel_degradation;
pub use sensor_integrity::{SensorIssue, detect_sensor_malfunction};
pub use weather_impact::{classify_weather_impact, weather_severity};

use heliowatch_types::{AnomalyType, Severity};

/// A positive finding from one detector invocation.
///
/// A detector that found nothing returns `None` instead, so these fields only
/// exist when something actually fired.
#[derive(Debug, Clone)]
pub struct Detection {
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    /// 0.0-1.0
    pub confidence: f32,
    /// Operator-facing summary shown on the dashboard and in alert mails
    pub description: String,
    pub recommendation: String,
    /// Detector-specific evidence, stored verbatim on the anomaly record
    pub details: serde_json::Value,
}
