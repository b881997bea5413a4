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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= Classification Enums =============

/// Anomaly categories produced by the detection engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyType {
    /// Unit produces essentially nothing in clear daylight
    CompleteFailure,
    /// Output has dropped against the unit's own recent history
    Degradation,
    /// Reduced output explained by cloud cover or precipitation
    WeatherRelated,
    /// Reported values are physically implausible or frozen
    SensorMalfunction,
}

impl AnomalyType {
    /// Get human-readable name for the anomaly type
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CompleteFailure => "Complete Failure",
            Self::Degradation => "Degradation",
            Self::WeatherRelated => "Weather Related",
            Self::SensorMalfunction => "Sensor Malfunction",
        }
    }

    /// Get storage string value (kebab-case)
    pub fn to_storage_value(&self) -> &'static str {
        match self {
            Self::CompleteFailure => "complete-failure",
            Self::Degradation => "degradation",
            Self::WeatherRelated => "weather-related",
            Self::SensorMalfunction => "sensor-malfunction",
        }
    }

    /// List all anomaly types
    pub fn all() -> &'static [AnomalyType] {
        &[
            Self::CompleteFailure,
            Self::Degradation,
            Self::WeatherRelated,
            Self::SensorMalfunction,
        ]
    }
}

impl fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for AnomalyType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "complete-failure" => Ok(Self::CompleteFailure),
            "degradation" => Ok(Self::Degradation),
            "weather-related" => Ok(Self::WeatherRelated),
            "sensor-malfunction" => Ok(Self::SensorMalfunction),
            _ => Err(anyhow::anyhow!(
                "Unknown anomaly type: '{}'. Known types: {}",
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

/// Severity levels, ordered from least to most urgent.
/// The derived `Ord` is what detectors use to pick the worst finding,
/// so the variant order here is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Get human-readable name for the severity
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Get storage string value (kebab-case)
    pub fn to_storage_value(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(anyhow::anyhow!("Unknown severity: '{s}'")),
        }
    }
}

/// Workflow state of a stored anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnomalyStatus {
    #[default]
    Active,
    Acknowledged,
    Resolved,
}

impl AnomalyStatus {
    /// Transitions only move forward. A resolved anomaly never reopens;
    /// if the condition persists, the next detection run records a fresh one.
    pub fn can_transition_to(self, next: AnomalyStatus) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Acknowledged | Self::Resolved)
                | (Self::Acknowledged, Self::Resolved)
        )
    }

    /// Get storage string value (kebab-case)
    pub fn to_storage_value(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for AnomalyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "Active",
            Self::Acknowledged => "Acknowledged",
            Self::Resolved => "Resolved",
        };
        write!(f, "{name}")
    }
}

impl FromStr for AnomalyStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "acknowledged" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            _ => Err(anyhow::anyhow!("Unknown anomaly status: '{s}'")),
        }
    }
}

// ============= Stored Record =============

/// A persisted anomaly as stored by the server and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Database row id
    pub id: i64,
    pub unit_id: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub status: AnomalyStatus,

    /// When the detection run found this anomaly
    pub detected_at: DateTime<Utc>,

    /// Affected period, always a full calendar day of the unit's local time
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,

    pub description: String,
    pub recommendation: String,

    /// Detector confidence, 0.0-1.0
    pub confidence: f32,

    /// Detector-specific evidence (issue lists, reduction percentages, ...)
    pub details: serde_json::Value,

    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
}
