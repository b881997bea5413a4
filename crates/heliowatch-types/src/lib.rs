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

pub mod anomaly;
pub mod reading;
pub mod unit;
pub mod weather;

// Re-export common types for convenience
pub use anomaly::{AnomalyRecord, AnomalyStatus, AnomalyType, Severity};
pub use reading::GenerationReading;
pub use unit::{SolarUnit, UnitStatus};
pub use weather::CurrentConditions;
