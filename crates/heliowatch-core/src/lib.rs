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

pub mod bucket;
pub mod daylight;
pub mod detect;
pub mod engine;
pub mod traits;

// Re-export common types for convenience
pub use bucket::{DailyBucket, baseline_daily_average, bucket_readings_by_local_day, local_day_bounds};
pub use daylight::{DaylightPolicy, FixedWindowDaylight, resolve_timezone};
pub use detect::{
    Detection, classify_weather_impact, detect_complete_failure, detect_panel_degradation,
    detect_sensor_malfunction,
};
pub use engine::{DetectionConfig, DetectionEngine, RunSummary};
pub use traits::{AnomalyStore, NewAnomaly, ReadingSource, UnitSource};
