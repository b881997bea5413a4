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

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub detection: DetectionSettings,
    pub email: EmailSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub weather: WeatherSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// Shared by field agents (ingest) and operators (unit admin, manual
    /// detection trigger)
    pub shared_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionSettings {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    #[serde(default = "default_history_days")]
    pub history_days: i64,
    #[serde(default = "default_degradation_threshold_pct")]
    pub degradation_threshold_pct: f32,
    /// Daylight window used when a unit has no astronomical data, local hours
    #[serde(default = "default_daylight_start_hour")]
    pub daylight_start_hour: u32,
    #[serde(default = "default_daylight_end_hour")]
    pub daylight_end_hour: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
    pub admin_recipients: Vec<String>,
    /// Minimum gap between alert mails for the same unit and anomaly type
    #[serde(default = "default_alert_cooldown_minutes")]
    pub alert_cooldown_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: String,
    #[serde(default = "default_reading_retention_days")]
    pub reading_retention_days: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    #[serde(default = "default_weather_enabled")]
    pub enabled: bool,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    #[serde(default = "default_weather_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_owned()
}

fn default_port() -> u16 {
    8200
}

fn default_interval_minutes() -> u64 {
    60
}

fn default_window_days() -> i64 {
    7
}

fn default_history_days() -> i64 {
    30
}

fn default_degradation_threshold_pct() -> f32 {
    15.0
}

fn default_daylight_start_hour() -> u32 {
    6
}

fn default_daylight_end_hour() -> u32 {
    18
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

fn default_alert_cooldown_minutes() -> u64 {
    360
}

fn default_db_path() -> String {
    "./data/heliowatch.db".to_owned()
}

fn default_reading_retention_days() -> u32 {
    90
}

fn default_weather_enabled() -> bool {
    true
}

fn default_weather_base_url() -> String {
    heliowatch_weather::client::DEFAULT_BASE_URL.to_owned()
}

fn default_weather_cache_ttl_minutes() -> u64 {
    15
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            window_days: default_window_days(),
            history_days: default_history_days(),
            degradation_threshold_pct: default_degradation_threshold_pct(),
            daylight_start_hour: default_daylight_start_hour(),
            daylight_end_hour: default_daylight_end_hour(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            reading_retention_days: default_reading_retention_days(),
        }
    }
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            enabled: default_weather_enabled(),
            base_url: default_weather_base_url(),
            cache_ttl_minutes: default_weather_cache_ttl_minutes(),
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Self =
            toml::from_str(&content).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.shared_secret.is_empty()
            || self.auth.shared_secret == "change-me-to-a-strong-random-secret"
        {
            bail!("auth.shared_secret must be set to a strong random value");
        }
        if self.email.smtp_host.is_empty() {
            bail!("email.smtp_host must be set");
        }
        if self.email.admin_recipients.is_empty() {
            bail!("email.admin_recipients must contain at least one address");
        }
        if self.detection.interval_minutes == 0 {
            bail!("detection.interval_minutes must be at least 1");
        }
        if self.detection.window_days <= 0
            || self.detection.history_days <= self.detection.window_days
        {
            bail!("detection.history_days must exceed detection.window_days (both positive)");
        }
        if self.detection.daylight_start_hour >= self.detection.daylight_end_hour
            || self.detection.daylight_end_hour > 24
        {
            bail!("detection daylight window must satisfy start < end <= 24");
        }
        Ok(())
    }
}
