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

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Row, params};
use std::path::Path;
use std::sync::Mutex;

use heliowatch_core::{AnomalyStore, NewAnomaly, ReadingSource, UnitSource};
use heliowatch_types::{
    AnomalyRecord, AnomalyStatus, AnomalyType, GenerationReading, SolarUnit, UnitStatus,
};

#[derive(Debug)]
pub struct Database {
    conn: Mutex<rusqlite::Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory: {}", parent.display())
            })?;
        }

        let conn = rusqlite::Connection::open(path)
            .with_context(|| format!("Failed to open database: {path}"))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS units (
                id                 TEXT PRIMARY KEY,
                name               TEXT,
                panel_capacity_kw  REAL NOT NULL,
                installed_on       TEXT,
                status             TEXT NOT NULL DEFAULT 'active',
                latitude           REAL,
                longitude          REAL,
                timezone           TEXT,
                registered_at      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS readings (
                id                 INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id            TEXT NOT NULL,
                taken_at           TEXT NOT NULL,
                energy_kwh         REAL NOT NULL,
                cloud_coverage_pct REAL NOT NULL,
                temperature_c      REAL NOT NULL,
                precipitation_mm   REAL NOT NULL,
                FOREIGN KEY (unit_id) REFERENCES units(id)
            );

            CREATE INDEX IF NOT EXISTS idx_readings_unit_time
                ON readings(unit_id, taken_at);

            CREATE TABLE IF NOT EXISTS anomalies (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id         TEXT NOT NULL,
                anomaly_type    TEXT NOT NULL,
                severity        TEXT NOT NULL,
                status          TEXT NOT NULL DEFAULT 'active',
                detected_at     TEXT NOT NULL,
                period_start    TEXT NOT NULL,
                period_end      TEXT NOT NULL,
                description     TEXT NOT NULL,
                recommendation  TEXT NOT NULL,
                confidence      REAL NOT NULL,
                details         TEXT NOT NULL,
                acknowledged_at TEXT,
                acknowledged_by TEXT,
                resolved_at     TEXT,
                resolved_by     TEXT,
                FOREIGN KEY (unit_id) REFERENCES units(id)
            );

            -- The dedup key: at most one record per unit, type and local day.
            -- Makes create an atomic insert-if-absent under concurrent runs.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_anomalies_dedup
                ON anomalies(unit_id, anomaly_type, period_start);

            CREATE TABLE IF NOT EXISTS notification_log (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id     TEXT NOT NULL,
                event_type  TEXT NOT NULL,
                sent_at     TEXT NOT NULL,
                recipients  TEXT NOT NULL
            );",
        )
        .context("Failed to initialize database schema")?;

        // Migrate units table: location and timezone columns arrived after
        // the first deployments (ignore if already exist)
        let migration_columns = ["latitude REAL", "longitude REAL", "timezone TEXT"];
        for col_def in &migration_columns {
            let sql = format!("ALTER TABLE units ADD COLUMN {col_def}");
            let _ = conn.execute_batch(&sql);
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ------------------------------------------------------------------
    // Units
    // ------------------------------------------------------------------

    pub fn upsert_unit(&self, unit: &SolarUnit) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let now = Utc::now();
        conn.execute(
            "INSERT INTO units (id, name, panel_capacity_kw, installed_on, status, latitude, longitude, timezone, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = ?2,
                panel_capacity_kw = ?3,
                installed_on = ?4,
                status = ?5,
                latitude = ?6,
                longitude = ?7,
                timezone = ?8",
            params![
                unit.id,
                unit.name,
                unit.panel_capacity_kw,
                unit.installed_on,
                unit.status.to_storage_value(),
                unit.latitude,
                unit.longitude,
                unit.timezone,
                now,
            ],
        )?;
        Ok(())
    }

    pub fn get_unit(&self, id: &str) -> Result<Option<SolarUnit>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, panel_capacity_kw, installed_on, status, latitude, longitude, timezone
             FROM units WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], unit_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn get_all_units(&self) -> Result<Vec<SolarUnit>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, panel_capacity_kw, installed_on, status, latitude, longitude, timezone
             FROM units ORDER BY id",
        )?;
        let units = stmt
            .query_map([], unit_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    // ------------------------------------------------------------------
    // Readings
    // ------------------------------------------------------------------

    pub fn insert_reading(&self, reading: &GenerationReading) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "INSERT INTO readings (unit_id, taken_at, energy_kwh, cloud_coverage_pct, temperature_c, precipitation_mm)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reading.unit_id,
                reading.taken_at,
                reading.energy_kwh,
                reading.cloud_coverage_pct,
                reading.temperature_c,
                reading.precipitation_mm,
            ],
        )?;
        Ok(())
    }

    pub fn readings_in_range(
        &self,
        unit_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GenerationReading>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT unit_id, taken_at, energy_kwh, cloud_coverage_pct, temperature_c, precipitation_mm
             FROM readings
             WHERE unit_id = ?1 AND taken_at >= ?2 AND taken_at < ?3
             ORDER BY taken_at",
        )?;
        let readings = stmt
            .query_map(params![unit_id, from, to], |row| {
                Ok(GenerationReading {
                    unit_id: row.get(0)?,
                    taken_at: row.get(1)?,
                    energy_kwh: row.get(2)?,
                    cloud_coverage_pct: row.get(3)?,
                    temperature_c: row.get(4)?,
                    precipitation_mm: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(readings)
    }

    pub fn last_reading_at(&self, unit_id: &str) -> Option<DateTime<Utc>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.query_row(
            "SELECT taken_at FROM readings WHERE unit_id = ?1 ORDER BY taken_at DESC LIMIT 1",
            params![unit_id],
            |row| row.get(0),
        )
        .ok()
    }

    pub fn cleanup_old_readings(&self, retention_days: u32) -> Result<u64> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
        let deleted = conn.execute(
            "DELETE FROM readings WHERE taken_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted as u64)
    }

    // ------------------------------------------------------------------
    // Anomalies
    // ------------------------------------------------------------------

    pub fn insert_anomaly(&self, new: &NewAnomaly) -> Result<(AnomalyRecord, bool)> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let details = serde_json::to_string(&new.details)?;
        let inserted = conn.execute(
            "INSERT INTO anomalies (unit_id, anomaly_type, severity, status, detected_at,
                                    period_start, period_end, description, recommendation,
                                    confidence, details)
             VALUES (?1, ?2, ?3, 'active', ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(unit_id, anomaly_type, period_start) DO NOTHING",
            params![
                new.unit_id,
                new.anomaly_type.to_storage_value(),
                new.severity.to_storage_value(),
                new.detected_at,
                new.period_start,
                new.period_end,
                new.description,
                new.recommendation,
                new.confidence,
                details,
            ],
        )?;

        let record = conn
            .query_row(
                &format!(
                    "SELECT {ANOMALY_COLUMNS} FROM anomalies
                     WHERE unit_id = ?1 AND anomaly_type = ?2 AND period_start = ?3"
                ),
                params![
                    new.unit_id,
                    new.anomaly_type.to_storage_value(),
                    new.period_start
                ],
                anomaly_from_row,
            )
            .context("Anomaly row missing directly after insert")?;
        Ok((record, inserted > 0))
    }

    pub fn find_anomaly_overlapping(
        &self,
        unit_id: &str,
        anomaly_type: AnomalyType,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<AnomalyRecord>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANOMALY_COLUMNS} FROM anomalies
             WHERE unit_id = ?1 AND anomaly_type = ?2
               AND period_start < ?4 AND period_end > ?3
             LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(
            params![unit_id, anomaly_type.to_storage_value(), day_start, day_end],
            anomaly_from_row,
        )?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn get_anomaly(&self, id: i64) -> Result<Option<AnomalyRecord>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANOMALY_COLUMNS} FROM anomalies WHERE id = ?1"
        ))?;
        let mut rows = stmt.query_map(params![id], anomaly_from_row)?;
        rows.next().transpose().map_err(Into::into)
    }

    pub fn list_anomalies(
        &self,
        status: Option<AnomalyStatus>,
        unit_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AnomalyRecord>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let mut stmt = conn.prepare(&format!(
            "SELECT {ANOMALY_COLUMNS} FROM anomalies
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR unit_id = ?2)
             ORDER BY detected_at DESC
             LIMIT ?3"
        ))?;
        let anomalies = stmt
            .query_map(
                params![
                    status.map(|s| s.to_storage_value()),
                    unit_id,
                    limit as i64
                ],
                anomaly_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(anomalies)
    }

    pub fn active_anomaly_count(&self, unit_id: &str) -> Result<i64> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let count = conn.query_row(
            "SELECT COUNT(*) FROM anomalies WHERE unit_id = ?1 AND status = 'active'",
            params![unit_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn mark_acknowledged(&self, id: i64, by: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "UPDATE anomalies SET status = 'acknowledged', acknowledged_at = ?1, acknowledged_by = ?2
             WHERE id = ?3",
            params![Utc::now(), by, id],
        )?;
        Ok(())
    }

    pub fn mark_resolved(&self, id: i64, by: &str) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.execute(
            "UPDATE anomalies SET status = 'resolved', resolved_at = ?1, resolved_by = ?2
             WHERE id = ?3",
            params![Utc::now(), by, id],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn log_notification(
        &self,
        unit_id: &str,
        event_type: &str,
        recipients: &[String],
    ) -> Result<()> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        let recipients_json = serde_json::to_string(recipients)?;
        conn.execute(
            "INSERT INTO notification_log (unit_id, event_type, sent_at, recipients) VALUES (?1, ?2, ?3, ?4)",
            params![unit_id, event_type, Utc::now(), recipients_json],
        )?;
        Ok(())
    }

    pub fn last_notification_for(&self, unit_id: &str, event_type: &str) -> Option<DateTime<Utc>> {
        let conn = self.conn.lock().expect("database mutex poisoned");
        conn.query_row(
            "SELECT sent_at FROM notification_log WHERE unit_id = ?1 AND event_type = ?2 ORDER BY sent_at DESC LIMIT 1",
            params![unit_id, event_type],
            |row| row.get(0),
        )
        .ok()
    }
}

const ANOMALY_COLUMNS: &str = "id, unit_id, anomaly_type, severity, status, detected_at, \
                               period_start, period_end, description, recommendation, \
                               confidence, details, acknowledged_at, acknowledged_by, \
                               resolved_at, resolved_by";

fn unit_from_row(row: &Row<'_>) -> rusqlite::Result<SolarUnit> {
    Ok(SolarUnit {
        id: row.get(0)?,
        name: row.get(1)?,
        panel_capacity_kw: row.get(2)?,
        installed_on: row.get(3)?,
        status: parse_column(row, 4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        timezone: row.get(7)?,
    })
}

fn anomaly_from_row(row: &Row<'_>) -> rusqlite::Result<AnomalyRecord> {
    let details: String = row.get(11)?;
    let details = serde_json::from_str(&details).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(AnomalyRecord {
        id: row.get(0)?,
        unit_id: row.get(1)?,
        anomaly_type: parse_column(row, 2)?,
        severity: parse_column(row, 3)?,
        status: parse_column(row, 4)?,
        detected_at: row.get(5)?,
        period_start: row.get(6)?,
        period_end: row.get(7)?,
        description: row.get(8)?,
        recommendation: row.get(9)?,
        confidence: row.get(10)?,
        details,
        acknowledged_at: row.get(12)?,
        acknowledged_by: row.get(13)?,
        resolved_at: row.get(14)?,
        resolved_by: row.get(15)?,
    })
}

/// Parse an enum stored as its kebab-case storage value.
fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = anyhow::Error>,
{
    let text: String = row.get(idx)?;
    text.parse().map_err(|e: anyhow::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

// The engine reaches storage only through these traits; the detection math
// never sees SQL.

#[async_trait]
impl ReadingSource for Database {
    async fn readings_between(
        &self,
        unit_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GenerationReading>> {
        self.readings_in_range(unit_id, from, to)
    }
}

#[async_trait]
impl UnitSource for Database {
    async fn active_units(&self) -> Result<Vec<SolarUnit>> {
        Ok(self
            .get_all_units()?
            .into_iter()
            .filter(|u| u.status == UnitStatus::Active)
            .collect())
    }
}

#[async_trait]
impl AnomalyStore for Database {
    async fn find_existing(
        &self,
        unit_id: &str,
        anomaly_type: AnomalyType,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Option<AnomalyRecord>> {
        self.find_anomaly_overlapping(unit_id, anomaly_type, day_start, day_end)
    }

    async fn create(&self, new: NewAnomaly) -> Result<(AnomalyRecord, bool)> {
        self.insert_anomaly(&new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use heliowatch_types::Severity;
    use serde_json::json;

    fn test_unit(id: &str, status: UnitStatus) -> SolarUnit {
        SolarUnit {
            id: id.to_owned(),
            name: Some(format!("Unit {id}")),
            panel_capacity_kw: 5.0,
            installed_on: None,
            status,
            latitude: Some(50.08),
            longitude: Some(14.43),
            timezone: Some("Europe/Prague".to_owned()),
        }
    }

    fn test_anomaly(unit_id: &str, day: u32) -> NewAnomaly {
        NewAnomaly {
            unit_id: unit_id.to_owned(),
            anomaly_type: AnomalyType::CompleteFailure,
            severity: Severity::Critical,
            detected_at: Utc.with_ymd_and_hms(2025, 6, day, 15, 0, 0).unwrap(),
            period_start: Utc.with_ymd_and_hms(2025, 6, day, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 6, day + 1, 0, 0, 0).unwrap(),
            description: "No generation in daylight".to_owned(),
            recommendation: "Check the inverter".to_owned(),
            confidence: 0.95,
            details: json!({"capacity_pct": 0.1}),
        }
    }

    #[test]
    fn test_unit_round_trip() {
        let db = Database::open(":memory:").unwrap();
        let unit = test_unit("u1", UnitStatus::Active);
        db.upsert_unit(&unit).unwrap();

        let loaded = db.get_unit("u1").unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("Unit u1"));
        assert_eq!(loaded.status, UnitStatus::Active);
        assert_eq!(loaded.timezone.as_deref(), Some("Europe/Prague"));

        // Upsert updates in place
        let mut changed = unit;
        changed.panel_capacity_kw = 9.9;
        changed.status = UnitStatus::Maintenance;
        db.upsert_unit(&changed).unwrap();

        let reloaded = db.get_unit("u1").unwrap().unwrap();
        assert!((reloaded.panel_capacity_kw - 9.9).abs() < 1e-6);
        assert_eq!(reloaded.status, UnitStatus::Maintenance);
        assert_eq!(db.get_all_units().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_active_units_excludes_maintenance() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("a", UnitStatus::Active)).unwrap();
        db.upsert_unit(&test_unit("b", UnitStatus::Maintenance))
            .unwrap();
        db.upsert_unit(&test_unit("c", UnitStatus::Decommissioned))
            .unwrap();

        let active = db.active_units().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "a");
    }

    #[test]
    fn test_readings_range_is_half_open() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();

        for hour in [8, 10, 12] {
            db.insert_reading(&GenerationReading {
                unit_id: "u1".to_owned(),
                energy_kwh: 1.0,
                taken_at: Utc.with_ymd_and_hms(2025, 6, 15, hour, 0, 0).unwrap(),
                cloud_coverage_pct: 10.0,
                temperature_c: 20.0,
                precipitation_mm: 0.0,
            })
            .unwrap();
        }

        let from = Utc.with_ymd_and_hms(2025, 6, 15, 8, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let rows = db.readings_in_range("u1", from, to).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].taken_at < rows[1].taken_at);
    }

    #[test]
    fn test_anomaly_insert_is_idempotent_on_dedup_key() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();

        let (first, created) = db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();
        assert!(created);

        let (second, created_again) = db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);

        // A different day is a fresh record
        let (_, new_day) = db.insert_anomaly(&test_anomaly("u1", 16)).unwrap();
        assert!(new_day);
    }

    #[test]
    fn test_anomaly_round_trip_preserves_enums_and_details() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();
        db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();

        let loaded = db.get_anomaly(1).unwrap().unwrap();
        assert_eq!(loaded.anomaly_type, AnomalyType::CompleteFailure);
        assert_eq!(loaded.severity, Severity::Critical);
        assert_eq!(loaded.status, AnomalyStatus::Active);
        assert_eq!(loaded.details["capacity_pct"], 0.1);
    }

    #[test]
    fn test_overlap_lookup_matches_day() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();
        db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();

        let day_start = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let day_end = Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap();
        assert!(
            db.find_anomaly_overlapping("u1", AnomalyType::CompleteFailure, day_start, day_end)
                .unwrap()
                .is_some()
        );

        // Adjacent day does not overlap a half-open period
        let next_start = day_end;
        let next_end = Utc.with_ymd_and_hms(2025, 6, 17, 0, 0, 0).unwrap();
        assert!(
            db.find_anomaly_overlapping("u1", AnomalyType::CompleteFailure, next_start, next_end)
                .unwrap()
                .is_none()
        );

        // Same day, different type
        assert!(
            db.find_anomaly_overlapping("u1", AnomalyType::Degradation, day_start, day_end)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_status_updates_and_filtering() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();
        db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();
        db.insert_anomaly(&test_anomaly("u1", 16)).unwrap();

        db.mark_acknowledged(1, "operator@example.com").unwrap();

        let active = db.list_anomalies(Some(AnomalyStatus::Active), None, 100).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 2);

        let acked = db
            .list_anomalies(Some(AnomalyStatus::Acknowledged), None, 100)
            .unwrap();
        assert_eq!(acked.len(), 1);
        assert_eq!(acked[0].acknowledged_by.as_deref(), Some("operator@example.com"));
        assert!(acked[0].acknowledged_at.is_some());

        db.mark_resolved(1, "operator@example.com").unwrap();
        let resolved = db.get_anomaly(1).unwrap().unwrap();
        assert_eq!(resolved.status, AnomalyStatus::Resolved);
        assert!(resolved.resolved_at.is_some());

        assert_eq!(db.active_anomaly_count("u1").unwrap(), 1);
    }

    #[test]
    fn test_reading_cleanup_respects_retention() {
        let db = Database::open(":memory:").unwrap();
        db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();

        let old = Utc::now() - chrono::Duration::days(120);
        let recent = Utc::now() - chrono::Duration::days(5);
        for taken_at in [old, recent] {
            db.insert_reading(&GenerationReading {
                unit_id: "u1".to_owned(),
                energy_kwh: 1.0,
                taken_at,
                cloud_coverage_pct: 0.0,
                temperature_c: 20.0,
                precipitation_mm: 0.0,
            })
            .unwrap();
        }

        let deleted = db.cleanup_old_readings(90).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(db.last_reading_at("u1"), Some(recent));
    }

    #[test]
    fn test_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("heliowatch.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(path).unwrap();
            db.upsert_unit(&test_unit("u1", UnitStatus::Active)).unwrap();
            db.insert_anomaly(&test_anomaly("u1", 15)).unwrap();
        }

        // Reopen runs schema setup and migrations against the existing file
        let db = Database::open(path).unwrap();
        assert!(db.get_unit("u1").unwrap().is_some());
        assert_eq!(db.get_anomaly(1).unwrap().unwrap().severity, Severity::Critical);
    }

    #[test]
    fn test_notification_cooldown_lookup() {
        let db = Database::open(":memory:").unwrap();
        assert!(db.last_notification_for("u1", "critical-complete-failure").is_none());

        db.log_notification("u1", "critical-complete-failure", &["ops@example.com".to_owned()])
            .unwrap();
        assert!(db.last_notification_for("u1", "critical-complete-failure").is_some());
        assert!(db.last_notification_for("u1", "critical-degradation").is_none());
    }
}
