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
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heliowatch_types::{AnomalyRecord, AnomalyType, GenerationReading, Severity, SolarUnit};

/// Insertable anomaly shape handed to the store by the orchestrator.
/// The store assigns the row id and the initial `Active` status.
#[derive(Debug, Clone)]
pub struct NewAnomaly {
    pub unit_id: String,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub detected_at: DateTime<Utc>,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub description: String,
    pub recommendation: String,
    pub confidence: f32,
    pub details: serde_json::Value,
}

/// Source of stored generation readings
/// Business logic uses this trait, never knows about SQL details
#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Fetch readings for one unit over the half-open range `[from, to)`,
    /// oldest first
    async fn readings_between(
        &self,
        unit_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GenerationReading>>;
}

/// Source of unit profiles
#[async_trait]
pub trait UnitSource: Send + Sync {
    /// Fetch all units the detection run should cover
    async fn active_units(&self) -> Result<Vec<SolarUnit>>;
}

/// Store for persisted anomaly records
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    /// Find a record for the same `(unit, type, day)` dedup key, matching on
    /// affected-period overlap with `[day_start, day_end)`
    async fn find_existing(
        &self,
        unit_id: &str,
        anomaly_type: AnomalyType,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<AnomalyRecord>>;

    /// Insert-if-absent on the dedup key. Returns the stored record and
    /// whether this call inserted it; a concurrent run may have won the race,
    /// in which case the existing record comes back with `false`.
    async fn create(&self, new: NewAnomaly) -> Result<(AnomalyRecord, bool)>;
}
