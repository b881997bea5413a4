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
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use heliowatch_core::{
    AnomalyStore, DetectionConfig, DetectionEngine, FixedWindowDaylight, ReadingSource, UnitSource,
};
use heliowatch_server::config::ServerConfig;
use heliowatch_server::db::Database;
use heliowatch_server::notifications::EmailNotifier;
use heliowatch_server::state::AppState;
use heliowatch_server::{router, scheduler};
use heliowatch_weather::{OpenMeteoClient, WeatherCache, WeatherProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("heliowatch_server=info,heliowatch_core=info")),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "server_config.toml".to_owned());
    info!(path = %config_path, "Loading configuration");
    let config = Arc::new(ServerConfig::from_file(&config_path)?);

    let db = Arc::new(Database::open(&config.database.path)?);
    info!(path = %config.database.path, "Database opened");

    let notifier = Arc::new(EmailNotifier::new(&config.email)?);

    let weather = if config.weather.enabled {
        let client = OpenMeteoClient::new(config.weather.base_url.clone())?;
        let ttl = Duration::from_secs(config.weather.cache_ttl_minutes * 60);
        Some(Arc::new(WeatherCache::new(
            Arc::new(client) as Arc<dyn WeatherProvider>,
            ttl,
        )))
    } else {
        info!("Weather lookups disabled; readings will carry zeroed conditions");
        None
    };

    let engine = Arc::new(DetectionEngine::new(
        Arc::clone(&db) as Arc<dyn ReadingSource>,
        Arc::clone(&db) as Arc<dyn UnitSource>,
        Arc::clone(&db) as Arc<dyn AnomalyStore>,
        Arc::new(FixedWindowDaylight {
            start_hour: config.detection.daylight_start_hour,
            end_hour: config.detection.daylight_end_hour,
        }),
        DetectionConfig {
            window_days: config.detection.window_days,
            history_days: config.detection.history_days,
            degradation_threshold_pct: config.detection.degradation_threshold_pct,
        },
    ));

    scheduler::spawn_detection_loop(
        Arc::clone(&engine),
        Arc::clone(&db),
        Arc::clone(&config),
        Arc::clone(&notifier),
    );
    scheduler::spawn_reading_cleanup(Arc::clone(&db), config.database.reading_retention_days);

    let state = AppState {
        db,
        config: Arc::clone(&config),
        notifier,
        engine,
        weather,
    };
    let app = router(state);

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HelioWatch Server listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
