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

pub mod api;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod ingest;
pub mod notifications;
pub mod scheduler;
pub mod state;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::AppState;

/// The full route table, shared by the binary and the integration tests.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::dashboard_handler))
        .route("/api/readings", post(ingest::ingest_handler))
        .route("/api/units", get(api::list_units))
        .route("/api/units/{id}", put(api::upsert_unit))
        .route("/api/anomalies", get(api::list_anomalies))
        .route("/api/anomalies/{id}/acknowledge", post(api::acknowledge_anomaly))
        .route("/api/anomalies/{id}/resolve", post(api::resolve_anomaly))
        .route("/api/detection/run", post(api::trigger_detection))
        .with_state(state)
}
