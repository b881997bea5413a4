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
use serde::{Deserialize, Serialize};

/// Current weather at a unit's location, as reported by the provider.
/// Readings ingested without coordinates carry zeroed conditions instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Total cloud cover, 0-100 %
    pub cloud_coverage_pct: f32,

    /// Air temperature at 2 m, degrees Celsius
    pub temperature_c: f32,

    /// Precipitation over the last hour, mm
    pub precipitation_mm: f32,

    /// Provider-side observation time
    pub observed_at: DateTime<Utc>,
}

impl CurrentConditions {
    /// Placeholder conditions for units without a configured location.
    pub fn unknown(now: DateTime<Utc>) -> Self {
        Self {
            cloud_coverage_pct: 0.0,
            temperature_c: 0.0,
            precipitation_mm: 0.0,
            observed_at: now,
        }
    }
}
