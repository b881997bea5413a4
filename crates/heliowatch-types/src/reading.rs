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

/// A single generation report from a field unit.
///
/// Units report periodically; `energy_kwh` is the energy produced since the
/// previous report, not a cumulative meter value. Weather fields capture the
/// conditions at the unit's location when the reading was stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReading {
    pub unit_id: String,

    /// Energy generated since the previous report, in kWh.
    pub energy_kwh: f32,

    /// When the generation was measured.
    pub taken_at: DateTime<Utc>,

    /// Cloud coverage at the unit's location, 0-100 %.
    pub cloud_coverage_pct: f32,

    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f32,

    /// Precipitation in millimetres.
    pub precipitation_mm: f32,
}
