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

use tokio::task::JoinHandle;
use tracing::{error, info};

use heliowatch_core::DetectionEngine;

use crate::config::ServerConfig;
use crate::db::Database;
use crate::notifications::{self, EmailNotifier};

/// Recurring detection runs. The first tick fires immediately, so the fleet
/// is evaluated at startup; a failed run is logged and the loop keeps going.
pub fn spawn_detection_loop(
    engine: Arc<DetectionEngine>,
    db: Arc<Database>,
    config: Arc<ServerConfig>,
    notifier: Arc<EmailNotifier>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let minutes = config.detection.interval_minutes;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(minutes * 60));
        info!(interval_minutes = minutes, "Detection scheduler started");

        loop {
            interval.tick().await;

            match engine.run_detection().await {
                Ok(summary) => {
                    notifications::alert_on_new_criticals(
                        &db,
                        &notifier,
                        config.email.alert_cooldown_minutes,
                        &summary,
                    )
                    .await;
                }
                Err(e) => {
                    error!(error = %e, "Scheduled detection run failed");
                }
            }
        }
    })
}

/// Daily retention cleanup for raw readings.
pub fn spawn_reading_cleanup(db: Arc<Database>, retention_days: u32) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(86400));
        loop {
            interval.tick().await;
            match db.cleanup_old_readings(retention_days) {
                Ok(deleted) if deleted > 0 => {
                    info!(deleted, "Cleaned up old readings");
                }
                Err(e) => {
                    error!(error = %e, "Failed to clean up old readings");
                }
                _ => {}
            }
        }
    })
}
