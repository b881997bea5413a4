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
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use heliowatch_types::{AnomalyStatus, SolarUnit, UnitStatus};

use crate::notifications;
use crate::state::AppState;

fn error_body(message: impl Into<String>) -> Json<serde_json::Value> {
    Json(json!({ "error": message.into() }))
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct UnitUpsertRequest {
    pub shared_secret: String,
    pub name: Option<String>,
    pub panel_capacity_kw: f32,
    pub installed_on: Option<NaiveDate>,
    #[serde(default)]
    pub status: UnitStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UnitSummary {
    #[serde(flatten)]
    pub unit: SolarUnit,
    pub active_anomalies: i64,
    pub last_reading_at: Option<DateTime<Utc>>,
}

/// `PUT /api/units/{id}` — register or update a unit profile.
pub async fn upsert_unit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UnitUpsertRequest>,
) -> Response {
    if request.shared_secret != state.config.auth.shared_secret {
        warn!(unit_id = %id, "Unit upsert rejected: invalid shared secret");
        return (StatusCode::UNAUTHORIZED, error_body("Invalid shared secret")).into_response();
    }
    if !request.panel_capacity_kw.is_finite() || request.panel_capacity_kw <= 0.0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            error_body("panel_capacity_kw must be positive"),
        )
            .into_response();
    }

    let unit = SolarUnit {
        id,
        name: request.name,
        panel_capacity_kw: request.panel_capacity_kw,
        installed_on: request.installed_on,
        status: request.status,
        latitude: request.latitude,
        longitude: request.longitude,
        timezone: request.timezone,
    };

    match state.db.upsert_unit(&unit) {
        Ok(()) => {
            info!(unit_id = %unit.id, capacity_kw = unit.panel_capacity_kw, "Unit registered");
            (StatusCode::OK, Json(unit)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to upsert unit");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error")).into_response()
        }
    }
}

/// `GET /api/units` — fleet listing with per-unit anomaly counts.
pub async fn list_units(State(state): State<AppState>) -> Response {
    let units = match state.db.get_all_units() {
        Ok(units) => units,
        Err(e) => {
            error!(error = %e, "Failed to list units");
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error"))
                .into_response();
        }
    };

    let summaries: Vec<UnitSummary> = units
        .into_iter()
        .map(|unit| {
            let active_anomalies = state.db.active_anomaly_count(&unit.id).unwrap_or(0);
            let last_reading_at = state.db.last_reading_at(&unit.id);
            UnitSummary {
                unit,
                active_anomalies,
                last_reading_at,
            }
        })
        .collect();

    (StatusCode::OK, Json(summaries)).into_response()
}

// ---------------------------------------------------------------------------
// Anomalies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AnomalyFilter {
    pub status: Option<String>,
    pub unit_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    200
}

/// `GET /api/anomalies` — list anomaly records, newest first.
pub async fn list_anomalies(
    State(state): State<AppState>,
    Query(filter): Query<AnomalyFilter>,
) -> Response {
    let status = match filter.status.as_deref() {
        Some(raw) => match raw.parse::<AnomalyStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                return (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response();
            }
        },
        None => None,
    };

    match state
        .db
        .list_anomalies(status, filter.unit_id.as_deref(), filter.limit)
    {
        Ok(anomalies) => (StatusCode::OK, Json(anomalies)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list anomalies");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error")).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
    /// Operator identity recorded on the transition
    pub by: String,
}

/// `POST /api/anomalies/{id}/acknowledge`
pub async fn acknowledge_anomaly(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusChangeRequest>,
) -> Response {
    transition_anomaly(&state, id, AnomalyStatus::Acknowledged, &request.by)
}

/// `POST /api/anomalies/{id}/resolve`
pub async fn resolve_anomaly(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<StatusChangeRequest>,
) -> Response {
    transition_anomaly(&state, id, AnomalyStatus::Resolved, &request.by)
}

/// Status moves forward only; a resolved record never reopens. This is the
/// API-boundary guard, the engine itself never mutates status.
fn transition_anomaly(state: &AppState, id: i64, next: AnomalyStatus, by: &str) -> Response {
    let record = match state.db.get_anomaly(id) {
        Ok(Some(record)) => record,
        Ok(None) => {
            return (StatusCode::NOT_FOUND, error_body(format!("No anomaly with id {id}")))
                .into_response();
        }
        Err(e) => {
            error!(error = %e, "Failed to load anomaly");
            return (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error"))
                .into_response();
        }
    };

    if !record.status.can_transition_to(next) {
        return (
            StatusCode::CONFLICT,
            error_body(format!("Cannot move a {} anomaly to {next}", record.status)),
        )
            .into_response();
    }

    let result = match next {
        AnomalyStatus::Acknowledged => state.db.mark_acknowledged(id, by),
        AnomalyStatus::Resolved => state.db.mark_resolved(id, by),
        AnomalyStatus::Active => unreachable!("no transition leads back to active"),
    };
    if let Err(e) = result {
        error!(error = %e, "Failed to update anomaly status");
        return (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error")).into_response();
    }

    info!(anomaly_id = id, status = %next, by = %by, "Anomaly status updated");
    match state.db.get_anomaly(id) {
        Ok(Some(updated)) => (StatusCode::OK, Json(updated)).into_response(),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error")).into_response(),
    }
}

// ---------------------------------------------------------------------------
// Detection trigger
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub shared_secret: String,
}

/// `POST /api/detection/run` — manual trigger for the detection engine.
/// Shares alerting with the scheduler, so a manually found Critical anomaly
/// mails out the same way.
pub async fn trigger_detection(
    State(state): State<AppState>,
    Json(request): Json<TriggerRequest>,
) -> Response {
    if request.shared_secret != state.config.auth.shared_secret {
        warn!("Detection trigger rejected: invalid shared secret");
        return (StatusCode::UNAUTHORIZED, error_body("Invalid shared secret")).into_response();
    }

    match state.engine.run_detection().await {
        Ok(summary) => {
            notifications::alert_on_new_criticals(
                &state.db,
                &state.notifier,
                state.config.email.alert_cooldown_minutes,
                &summary,
            )
            .await;
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Manual detection run failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(format!("Detection run failed: {e}")),
            )
                .into_response()
        }
    }
}
