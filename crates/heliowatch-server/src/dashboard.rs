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

use askama::Template;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use tracing::error;

use heliowatch_types::{AnomalyStatus, Severity};

use crate::state::AppState;

#[derive(Debug, Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub units: Vec<DashboardUnit>,
    pub total: usize,
    pub active: usize,
    pub critical: usize,
    pub high: usize,
    pub recent: Vec<DashboardAnomaly>,
    pub server_time: String,
}

#[derive(Debug)]
pub struct DashboardUnit {
    pub id: String,
    pub name: String,
    pub status: String,
    pub status_class: String,
    pub capacity_kw: String,
    pub last_report_relative: String,
    pub active_anomalies: i64,
}

#[derive(Debug)]
pub struct DashboardAnomaly {
    pub unit_name: String,
    pub anomaly_type: String,
    pub severity: String,
    pub severity_class: String,
    pub status: String,
    pub detected_relative: String,
    pub affected_day: String,
    pub confidence_pct: String,
    pub description: String,
}

#[expect(
    clippy::integer_division,
    reason = "integer truncation is intentional for relative time display"
)]
fn format_relative_time(seconds: i64) -> String {
    if seconds < 60 {
        "just now".to_owned()
    } else if seconds < 3600 {
        let mins = seconds / 60;
        if mins == 1 {
            "1 minute ago".to_owned()
        } else {
            format!("{mins} minutes ago")
        }
    } else if seconds < 86400 {
        let hours = seconds / 3600;
        if hours == 1 {
            "1 hour ago".to_owned()
        } else {
            format!("{hours} hours ago")
        }
    } else {
        let days = seconds / 86400;
        if days == 1 {
            "1 day ago".to_owned()
        } else {
            format!("{days} days ago")
        }
    }
}

/// `GET /` — fleet overview for operators.
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn dashboard_handler(State(state): State<AppState>) -> impl IntoResponse {
    let now = Utc::now();

    let units = match state.db.get_all_units() {
        Ok(units) => units,
        Err(e) => {
            error!(error = %e, "Failed to fetch units for dashboard");
            return Html("<h1>Error loading dashboard</h1>".to_owned());
        }
    };

    let active_anomalies = state
        .db
        .list_anomalies(Some(AnomalyStatus::Active), None, 500)
        .unwrap_or_default();
    let critical = active_anomalies
        .iter()
        .filter(|a| a.severity == Severity::Critical)
        .count();
    let high = active_anomalies
        .iter()
        .filter(|a| a.severity == Severity::High)
        .count();

    let dashboard_units: Vec<DashboardUnit> = units
        .iter()
        .map(|unit| {
            let last_report_relative = state.db.last_reading_at(&unit.id).map_or_else(
                || "never".to_owned(),
                |at| format_relative_time(now.signed_duration_since(at).num_seconds().max(0)),
            );
            DashboardUnit {
                id: unit.id.clone(),
                name: unit.display_name().to_owned(),
                status: unit.status.display_name().to_owned(),
                status_class: unit.status.to_storage_value().to_owned(),
                capacity_kw: format!("{:.1}", unit.panel_capacity_kw),
                last_report_relative,
                active_anomalies: state.db.active_anomaly_count(&unit.id).unwrap_or(0),
            }
        })
        .collect();

    let recent: Vec<DashboardAnomaly> = state
        .db
        .list_anomalies(None, None, 25)
        .unwrap_or_default()
        .iter()
        .map(|record| {
            let unit_name = units
                .iter()
                .find(|u| u.id == record.unit_id)
                .map_or_else(|| record.unit_id.clone(), |u| u.display_name().to_owned());
            DashboardAnomaly {
                unit_name,
                anomaly_type: record.anomaly_type.display_name().to_owned(),
                severity: record.severity.display_name().to_owned(),
                severity_class: record.severity.to_storage_value().to_owned(),
                status: record.status.to_string(),
                detected_relative: format_relative_time(
                    now.signed_duration_since(record.detected_at).num_seconds().max(0),
                ),
                affected_day: record.period_start.format("%Y-%m-%d").to_string(),
                confidence_pct: format!("{:.0}", f64::from(record.confidence) * 100.0),
                description: record.description.clone(),
            }
        })
        .collect();

    let template = DashboardTemplate {
        total: dashboard_units.len(),
        active: dashboard_units.iter().filter(|u| u.status_class == "active").count(),
        critical,
        high,
        units: dashboard_units,
        recent,
        server_time: now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    };

    match template.render() {
        Ok(html) => Html(html),
        Err(e) => {
            error!(error = %e, "Template render error");
            Html(format!("<h1>Error rendering dashboard: {e}</h1>"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_time_buckets() {
        assert_eq!(format_relative_time(30), "just now");
        assert_eq!(format_relative_time(60), "1 minute ago");
        assert_eq!(format_relative_time(150), "2 minutes ago");
        assert_eq!(format_relative_time(3600), "1 hour ago");
        assert_eq!(format_relative_time(7300), "2 hours ago");
        assert_eq!(format_relative_time(90000), "1 day ago");
        assert_eq!(format_relative_time(200_000), "2 days ago");
    }
}
