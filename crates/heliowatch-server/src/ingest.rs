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

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use tracing::{info, warn};

use heliowatch_shared::{IngestResponse, ReadingIngestRequest};
use heliowatch_types::{CurrentConditions, GenerationReading};
use heliowatch_weather::WeatherProvider;

use crate::state::AppState;

fn response(ok: bool, accepted: usize, message: Option<String>) -> Json<IngestResponse> {
    Json(IngestResponse {
        ok,
        server_time: Utc::now(),
        accepted,
        message,
    })
}

/// `POST /api/readings` — field agents report batches of interval readings.
///
/// Samples arrive bare; the server attaches current weather from the cache
/// when the unit has coordinates. A weather outage must never drop energy
/// data, so on lookup failure the reading is stored with zeroed conditions.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(request): Json<ReadingIngestRequest>,
) -> impl IntoResponse {
    if request.shared_secret != state.config.auth.shared_secret {
        warn!(unit_id = %request.unit_id, "Reading batch rejected: invalid shared secret");
        return (
            StatusCode::UNAUTHORIZED,
            response(false, 0, Some("Invalid shared secret".to_owned())),
        );
    }

    let unit = match state.db.get_unit(&request.unit_id) {
        Ok(Some(unit)) => unit,
        Ok(None) => {
            warn!(unit_id = %request.unit_id, "Reading batch rejected: unknown unit");
            return (
                StatusCode::NOT_FOUND,
                response(false, 0, Some("Unknown unit; register it first".to_owned())),
            );
        }
        Err(e) => {
            warn!(error = %e, "Failed to look up unit");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                response(false, 0, Some("Database error".to_owned())),
            );
        }
    };

    let conditions = current_conditions_for(&state, &unit.latitude, &unit.longitude).await;

    let mut accepted = 0;
    for sample in &request.samples {
        let reading = GenerationReading {
            unit_id: unit.id.clone(),
            energy_kwh: sample.energy_kwh,
            taken_at: sample.taken_at,
            cloud_coverage_pct: conditions.cloud_coverage_pct,
            temperature_c: conditions.temperature_c,
            precipitation_mm: conditions.precipitation_mm,
        };
        match state.db.insert_reading(&reading) {
            Ok(()) => accepted += 1,
            Err(e) => warn!(error = %e, unit_id = %unit.id, "Failed to store reading"),
        }
    }

    info!(
        unit_id = %unit.id,
        samples = request.samples.len(),
        accepted,
        "Reading batch stored"
    );

    (StatusCode::OK, response(true, accepted, None))
}

async fn current_conditions_for(
    state: &AppState,
    latitude: &Option<f64>,
    longitude: &Option<f64>,
) -> CurrentConditions {
    let now = Utc::now();
    let (Some(weather), Some(lat), Some(lon)) = (state.weather.as_ref(), latitude, longitude)
    else {
        return CurrentConditions::unknown(now);
    };

    match weather.current_conditions(*lat, *lon).await {
        Ok(conditions) => conditions,
        Err(e) => {
            warn!(error = %e, "Weather lookup failed, storing readings with zeroed conditions");
            CurrentConditions::unknown(now)
        }
    }
}
