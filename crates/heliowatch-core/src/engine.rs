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

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use heliowatch_types::{AnomalyRecord, Severity, SolarUnit};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::bucket::{baseline_daily_average, bucket_readings_by_local_day, local_day_bounds};
use crate::daylight::{DaylightPolicy, resolve_timezone};
use crate::detect::{
    Detection, classify_weather_impact, detect_complete_failure, detect_panel_degradation,
    detect_sensor_malfunction,
};
use crate::traits::{AnomalyStore, NewAnomaly, ReadingSource, UnitSource};

/// Tunables for a detection run.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Trailing window that gets bucketed and evaluated, in days
    pub window_days: i64,
    /// How far back the baseline averaging window reaches, in days.
    /// The baseline covers `[now - history_days, now - window_days)`.
    pub history_days: i64,
    /// Degradation percentage above which the degradation detector fires
    pub degradation_threshold_pct: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            window_days: 7,
            history_days: 30,
            degradation_threshold_pct: 15.0,
        }
    }
}

/// Outcome of one detection run, for logging, the trigger API and alerting.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub units_processed: usize,
    pub units_failed: usize,
    pub anomalies_created: usize,
    pub duplicates_suppressed: usize,
    /// Records this run actually inserted, newest unit first
    pub created: Vec<AnomalyRecord>,
}

/// The detection orchestrator.
///
/// Sequences the detectors over per-day buckets under a fixed precedence
/// policy and persists deduplicated anomaly records through the store trait.
/// One engine is shared between the scheduler loop and the manual trigger;
/// runs are idempotent, so overlapping invocations only cost wasted work.
pub struct DetectionEngine {
    readings: Arc<dyn ReadingSource>,
    units: Arc<dyn UnitSource>,
    store: Arc<dyn AnomalyStore>,
    daylight: Arc<dyn DaylightPolicy>,
    config: DetectionConfig,
}

impl std::fmt::Debug for DetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DetectionEngine {
    pub fn new(
        readings: Arc<dyn ReadingSource>,
        units: Arc<dyn UnitSource>,
        store: Arc<dyn AnomalyStore>,
        daylight: Arc<dyn DaylightPolicy>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            readings,
            units,
            store,
            daylight,
            config,
        }
    }

    /// Run detection across all active units.
    ///
    /// A unit whose processing fails is logged and skipped; failing to
    /// enumerate the units at all is a run-level error and propagates.
    pub async fn run_detection(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    /// Run detection as of a fixed instant. Split out so tests can pin `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let units = self
            .units
            .active_units()
            .await
            .context("Failed to enumerate active units")?;
        info!(units = units.len(), "Detection run started");

        let mut summary = RunSummary::default();
        for unit in &units {
            match self.process_unit(unit, now, &mut summary).await {
                Ok(()) => summary.units_processed += 1,
                Err(e) => {
                    error!(unit_id = %unit.id, error = %e, "Unit processing failed, continuing with remaining units");
                    summary.units_failed += 1;
                }
            }
        }

        info!(
            units_processed = summary.units_processed,
            units_failed = summary.units_failed,
            anomalies_created = summary.anomalies_created,
            duplicates_suppressed = summary.duplicates_suppressed,
            "Detection run finished"
        );
        Ok(summary)
    }

    async fn process_unit(
        &self,
        unit: &SolarUnit,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let tz = resolve_timezone(unit.timezone.as_deref());
        let window_start = now - Duration::days(self.config.window_days);
        let history_start = now - Duration::days(self.config.history_days);

        let recent = self
            .readings
            .readings_between(&unit.id, window_start, now)
            .await?;
        let history = self
            .readings
            .readings_between(&unit.id, history_start, window_start)
            .await?;

        let baseline_kwh = baseline_daily_average(&history, tz);
        let buckets = bucket_readings_by_local_day(&recent, tz);
        debug!(
            unit_id = %unit.id,
            buckets = buckets.len(),
            baseline_kwh,
            "Evaluating unit"
        );

        // Energy values of the whole window in chronological order; each
        // reading is checked against the trail up to and including itself.
        let mut trail: Vec<f32> = Vec::with_capacity(recent.len());

        for bucket in &buckets {
            let mut sensor_hit: Option<Detection> = None;
            for reading in &bucket.readings {
                trail.push(reading.energy_kwh);
                if sensor_hit.is_none() {
                    sensor_hit = detect_sensor_malfunction(
                        reading.energy_kwh,
                        unit.panel_capacity_kw,
                        reading.taken_at,
                        &trail,
                        self.daylight.as_ref(),
                        tz,
                    );
                }
            }

            // A malfunctioning sensor makes every downstream conclusion
            // meaningless; record it and skip the rest of this bucket.
            if let Some(detection) = sensor_hit {
                self.persist(unit, bucket.date, tz, now, detection, summary)
                    .await?;
                continue;
            }

            let mut critical_fired = false;
            let at = representative_instant(bucket.date, tz, now);

            if let Some(detection) = detect_complete_failure(
                bucket.total_energy_kwh,
                unit.panel_capacity_kw,
                at,
                bucket.avg_cloud_coverage_pct,
                self.daylight.as_ref(),
                tz,
            ) {
                critical_fired = critical_fired || detection.severity == Severity::Critical;
                self.persist(unit, bucket.date, tz, now, detection, summary)
                    .await?;
            }

            if let Some(detection) = classify_weather_impact(
                bucket.total_energy_kwh,
                baseline_kwh,
                bucket.avg_cloud_coverage_pct,
                bucket.avg_precipitation_mm,
            ) {
                critical_fired = critical_fired || detection.severity == Severity::Critical;
                self.persist(unit, bucket.date, tz, now, detection, summary)
                    .await?;
            }

            // Trend conclusions are unreliable next to an acute fault
            if !critical_fired
                && baseline_kwh > 0.0
                && let Some(detection) = detect_panel_degradation(
                    bucket.total_energy_kwh,
                    baseline_kwh,
                    self.config.degradation_threshold_pct,
                )
            {
                self.persist(unit, bucket.date, tz, now, detection, summary)
                    .await?;
            }
        }

        Ok(())
    }

    async fn persist(
        &self,
        unit: &SolarUnit,
        date: NaiveDate,
        tz: Tz,
        now: DateTime<Utc>,
        detection: Detection,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let (day_start, day_end) = local_day_bounds(date, tz);

        if let Some(existing) = self
            .store
            .find_existing(&unit.id, detection.anomaly_type, day_start, day_end)
            .await?
        {
            debug!(
                unit_id = %unit.id,
                anomaly_type = %detection.anomaly_type,
                date = %date,
                record_id = existing.id,
                "Anomaly already recorded for this day"
            );
            summary.duplicates_suppressed += 1;
            return Ok(());
        }

        let (record, created) = self
            .store
            .create(NewAnomaly {
                unit_id: unit.id.clone(),
                anomaly_type: detection.anomaly_type,
                severity: detection.severity,
                detected_at: now,
                period_start: day_start,
                period_end: day_end,
                description: detection.description,
                recommendation: detection.recommendation,
                confidence: detection.confidence,
                details: detection.details,
            })
            .await?;

        if created {
            info!(
                unit_id = %unit.id,
                anomaly_type = %record.anomaly_type,
                severity = %record.severity,
                date = %date,
                "Anomaly recorded"
            );
            summary.anomalies_created += 1;
            summary.created.push(record);
        } else {
            // A concurrent run inserted the same key between our lookup and
            // the insert; the unique index caught it.
            summary.duplicates_suppressed += 1;
        }
        Ok(())
    }
}

/// Instant at which bucket-level daytime checks evaluate a whole day.
///
/// Local noon makes completed days evaluable under the fixed daylight window;
/// clamping to `now` keeps the current day quiet before sunrise, so an early
/// morning run never flags today's zero output as a failure.
fn representative_instant(date: NaiveDate, tz: Tz, now: DateTime<Utc>) -> DateTime<Utc> {
    let noon = date.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN));
    let noon_utc = tz
        .from_local_datetime(&noon)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(&noon), |dt| dt.with_timezone(&Utc));
    noon_utc.min(now)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::daylight::FixedWindowDaylight;
    use async_trait::async_trait;
    use heliowatch_types::{AnomalyStatus, AnomalyType, GenerationReading, UnitStatus};

    // -----------------------------------------------------------------------
    // In-memory collaborators
    // -----------------------------------------------------------------------

    struct FakeFleet {
        units: Vec<SolarUnit>,
        readings: Vec<GenerationReading>,
        /// Unit ids whose reading lookups fail, for isolation tests
        broken_units: Vec<String>,
    }

    #[async_trait]
    impl UnitSource for FakeFleet {
        async fn active_units(&self) -> Result<Vec<SolarUnit>> {
            Ok(self.units.clone())
        }
    }

    #[async_trait]
    impl ReadingSource for FakeFleet {
        async fn readings_between(
            &self,
            unit_id: &str,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<GenerationReading>> {
            if self.broken_units.iter().any(|u| u == unit_id) {
                anyhow::bail!("reading store unavailable");
            }
            Ok(self
                .readings
                .iter()
                .filter(|r| r.unit_id == unit_id && r.taken_at >= from && r.taken_at < to)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        records: Mutex<Vec<AnomalyRecord>>,
    }

    impl MemoryStore {
        fn records(&self) -> Vec<AnomalyRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnomalyStore for MemoryStore {
        async fn find_existing(
            &self,
            unit_id: &str,
            anomaly_type: AnomalyType,
            day_start: DateTime<Utc>,
            day_end: DateTime<Utc>,
        ) -> Result<Option<AnomalyRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .find(|r| {
                    r.unit_id == unit_id
                        && r.anomaly_type == anomaly_type
                        && r.period_start < day_end
                        && r.period_end > day_start
                })
                .cloned())
        }

        async fn create(&self, new: NewAnomaly) -> Result<(AnomalyRecord, bool)> {
            let mut records = self.records.lock().unwrap();
            if let Some(existing) = records.iter().find(|r| {
                r.unit_id == new.unit_id
                    && r.anomaly_type == new.anomaly_type
                    && r.period_start == new.period_start
            }) {
                return Ok((existing.clone(), false));
            }
            let record = AnomalyRecord {
                id: records.len() as i64 + 1,
                unit_id: new.unit_id,
                anomaly_type: new.anomaly_type,
                severity: new.severity,
                status: AnomalyStatus::Active,
                detected_at: new.detected_at,
                period_start: new.period_start,
                period_end: new.period_end,
                description: new.description,
                recommendation: new.recommendation,
                confidence: new.confidence,
                details: new.details,
                acknowledged_at: None,
                acknowledged_by: None,
                resolved_at: None,
                resolved_by: None,
            };
            records.push(record.clone());
            Ok((record, true))
        }
    }

    // -----------------------------------------------------------------------
    // Test data helpers
    // -----------------------------------------------------------------------

    fn unit(id: &str) -> SolarUnit {
        SolarUnit {
            id: id.to_owned(),
            name: None,
            panel_capacity_kw: 5.0,
            installed_on: None,
            status: UnitStatus::Active,
            latitude: None,
            longitude: None,
            timezone: None,
        }
    }

    fn reading(unit_id: &str, taken_at: DateTime<Utc>, energy: f32, cloud: f32) -> GenerationReading {
        GenerationReading {
            unit_id: unit_id.to_owned(),
            energy_kwh: energy,
            taken_at,
            cloud_coverage_pct: cloud,
            temperature_c: 20.0,
            precipitation_mm: 0.0,
        }
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, hour, 0, 0).unwrap()
    }

    /// Runs evaluate as of 06:00 on June 16; June 15 is the last full day.
    fn run_instant() -> DateTime<Utc> {
        at(16, 6)
    }

    fn engine(fleet: FakeFleet) -> (DetectionEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let fleet = Arc::new(fleet);
        let engine = DetectionEngine::new(
            Arc::clone(&fleet) as Arc<dyn ReadingSource>,
            fleet as Arc<dyn UnitSource>,
            Arc::clone(&store) as Arc<dyn AnomalyStore>,
            Arc::new(FixedWindowDaylight::default()),
            DetectionConfig::default(),
        );
        (engine, store)
    }

    /// Baseline history of ~4 kWh per day over days 1-8 (outside the window).
    fn history_readings(unit_id: &str) -> Vec<GenerationReading> {
        (1..=8)
            .flat_map(|day| {
                vec![
                    reading(unit_id, at(day, 10), 1.5, 10.0),
                    reading(unit_id, at(day, 13), 2.5, 10.0),
                ]
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_complete_failure_end_to_end() {
        let mut readings = history_readings("u1");
        // Near-zero output all of June 15 under 25% cloud
        readings.push(reading("u1", at(15, 10), 0.01, 25.0));
        readings.push(reading("u1", at(15, 12), 0.0, 25.0));
        readings.push(reading("u1", at(15, 14), 0.01, 25.0));

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        let summary = engine.run_at(run_instant()).await.unwrap();

        assert_eq!(summary.units_processed, 1);
        assert_eq!(summary.units_failed, 0);

        let records = store.records();
        let failure = records
            .iter()
            .find(|r| r.anomaly_type == AnomalyType::CompleteFailure)
            .expect("complete failure not recorded");
        assert_eq!(failure.severity, Severity::Critical);
        assert_eq!(failure.status, AnomalyStatus::Active);
        assert!((failure.confidence - 0.95).abs() < 1e-6);
        // Affected period is the full calendar day
        assert_eq!(failure.period_start, at(15, 0));
        assert_eq!(failure.period_end, at(16, 0));
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let mut readings = history_readings("u1");
        readings.push(reading("u1", at(15, 12), 0.0, 25.0));

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });

        let first = engine.run_at(run_instant()).await.unwrap();
        let created_first = first.anomalies_created;
        assert!(created_first > 0);

        let second = engine.run_at(run_instant()).await.unwrap();
        assert_eq!(second.anomalies_created, 0);
        assert_eq!(second.duplicates_suppressed, created_first);
        assert_eq!(store.records().len(), created_first);
    }

    #[tokio::test]
    async fn test_sensor_malfunction_suppresses_other_detectors() {
        let mut readings = history_readings("u1");
        // June 15: generation reported at 23:00 (night) plus a dead day that
        // would otherwise trip complete failure and degradation
        readings.push(reading("u1", at(15, 12), 0.0, 25.0));
        readings.push(reading("u1", at(15, 23), 1.2, 25.0));

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(run_instant()).await.unwrap();

        let records = store.records();
        let june15: Vec<_> = records
            .iter()
            .filter(|r| r.period_start == at(15, 0))
            .collect();
        assert_eq!(june15.len(), 1);
        assert_eq!(june15[0].anomaly_type, AnomalyType::SensorMalfunction);
        assert_eq!(june15[0].severity, Severity::Critical);
    }

    #[tokio::test]
    async fn test_stuck_sensor_takes_precedence_over_degradation() {
        let mut readings = history_readings("u1");
        // Six identical non-zero daytime readings; the day total of 2.4 kWh
        // against a ~4 kWh baseline would otherwise register as degradation
        for hour in 9..15 {
            readings.push(reading("u1", Utc.with_ymd_and_hms(2025, 6, 15, hour, 0, 0).unwrap(), 0.4, 10.0));
        }

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(run_instant()).await.unwrap();

        let records = store.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].anomaly_type, AnomalyType::SensorMalfunction);
        assert_eq!(records[0].severity, Severity::High);
        assert!((records[0].confidence - 0.90).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_critical_result_gates_degradation() {
        let mut readings = history_readings("u1");
        // Dead day: complete failure fires Critical, so the massive
        // degradation against the baseline must stay unreported
        readings.push(reading("u1", at(15, 12), 0.0, 25.0));

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(run_instant()).await.unwrap();

        let records = store.records();
        assert!(
            records
                .iter()
                .all(|r| r.anomaly_type != AnomalyType::Degradation)
        );
        assert!(
            records
                .iter()
                .any(|r| r.anomaly_type == AnomalyType::CompleteFailure)
        );
    }

    #[tokio::test]
    async fn test_weather_masked_low_output() {
        let mut readings = history_readings("u1");
        // Heavy weather day: 0.45 kWh against the ~4 kWh baseline, 85% cloud
        // and 8 mm of rain; the shortfall matches the weather model
        readings.push(GenerationReading {
            precipitation_mm: 8.0,
            ..reading("u1", at(15, 12), 0.45, 85.0)
        });

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(run_instant()).await.unwrap();

        let records = store.records();
        let weather = records
            .iter()
            .find(|r| r.anomaly_type == AnomalyType::WeatherRelated)
            .expect("weather classification not recorded");
        assert_eq!(weather.severity, Severity::Low);
        assert_eq!(weather.details["is_panel_issue"], false);

        // Weather is not Critical, so the degradation detector still ran
        assert!(
            records
                .iter()
                .any(|r| r.anomaly_type == AnomalyType::Degradation)
        );
    }

    #[tokio::test]
    async fn test_unit_failure_does_not_abort_the_run() {
        let mut readings = history_readings("u2");
        readings.push(reading("u2", at(15, 12), 0.0, 25.0));

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1"), unit("u2")],
            readings,
            broken_units: vec!["u1".to_owned()],
        });
        let summary = engine.run_at(run_instant()).await.unwrap();

        assert_eq!(summary.units_failed, 1);
        assert_eq!(summary.units_processed, 1);
        // The healthy unit's anomaly still landed
        assert!(store.records().iter().any(|r| r.unit_id == "u2"));
    }

    #[tokio::test]
    async fn test_no_history_no_baseline_detectors() {
        // A freshly commissioned unit: window data only, nothing historical.
        // Weather and degradation need a baseline and must stay silent.
        let readings = vec![GenerationReading {
            precipitation_mm: 8.0,
            ..reading("u1", at(15, 12), 0.45, 85.0)
        }];

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(run_instant()).await.unwrap();

        assert!(
            store
                .records()
                .iter()
                .all(|r| r.anomaly_type == AnomalyType::CompleteFailure
                    || r.anomaly_type == AnomalyType::SensorMalfunction)
        );
    }

    #[tokio::test]
    async fn test_early_morning_run_does_not_flag_today() {
        // Run at 06:00 with today's first (zero) reading already stored.
        // The representative instant clamps to now, which is the edge of the
        // daylight window start in UTC; the day before sunrise has produced
        // nothing and that is fine.
        let readings = vec![reading("u1", at(16, 5), 0.0, 10.0)];

        let (engine, store) = engine(FakeFleet {
            units: vec![unit("u1")],
            readings,
            broken_units: vec![],
        });
        engine.run_at(Utc.with_ymd_and_hms(2025, 6, 16, 5, 30, 0).unwrap())
            .await
            .unwrap();

        assert!(store.records().is_empty());
    }
}
