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

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a monitored unit.
/// Only `Active` units are picked up by the detection scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnitStatus {
    #[default]
    Active,
    /// Temporarily offline for service work, skipped by detection
    Maintenance,
    /// Permanently retired, kept for historical queries only
    Decommissioned,
}

impl UnitStatus {
    /// Get human-readable name for the status
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Maintenance => "Maintenance",
            Self::Decommissioned => "Decommissioned",
        }
    }

    /// Get storage string value (kebab-case)
    pub fn to_storage_value(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Maintenance => "maintenance",
            Self::Decommissioned => "decommissioned",
        }
    }

    /// List all known statuses
    pub fn all() -> &'static [UnitStatus] {
        &[Self::Active, Self::Maintenance, Self::Decommissioned]
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for UnitStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "maintenance" => Ok(Self::Maintenance),
            "decommissioned" => Ok(Self::Decommissioned),
            _ => Err(anyhow::anyhow!(
                "Unknown unit status: '{}'. Known statuses: {}",
                s,
                Self::all()
                    .iter()
                    .map(|t| t.to_storage_value())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// A monitored solar installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolarUnit {
    /// Stable identifier chosen at registration, also used as the DB key
    pub id: String,

    /// Owner-facing name shown on the dashboard and in alert mails
    pub name: Option<String>,

    /// Rated peak capacity of the panel array, in kW
    pub panel_capacity_kw: f32,

    /// Commissioning date, if known
    pub installed_on: Option<NaiveDate>,

    pub status: UnitStatus,

    /// Location used for weather lookups. Units without coordinates get
    /// zeroed weather fields on ingest.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// IANA timezone name (e.g. "Europe/Prague") used for the local daylight
    /// window. Falls back to UTC when missing or unparseable.
    pub timezone: Option<String>,
}

impl SolarUnit {
    /// Name to show in logs, mails and on the dashboard.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
