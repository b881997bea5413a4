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

use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use heliowatch_types::CurrentConditions;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::cache::WeatherProvider;
use crate::error::{WeatherError, WeatherResult};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com";

/// Open-Meteo current-conditions client.
///
/// The free endpoint needs no token; requests ask for cloud cover,
/// temperature and precipitation at the given coordinates.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    /// ISO 8601 without offset, e.g. "2025-06-15T12:00"; UTC is requested
    /// explicitly in the query
    time: String,
    temperature_2m: f32,
    cloud_cover: f32,
    precipitation: f32,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> WeatherResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WeatherError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Set custom retry configuration
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    async fn fetch_current(&self, latitude: f64, longitude: f64) -> WeatherResult<CurrentConditions> {
        let url = format!(
            "{}/v1/forecast?latitude={latitude:.4}&longitude={longitude:.4}\
             &current=temperature_2m,cloud_cover,precipitation&timezone=UTC",
            self.base_url
        );
        debug!(latitude, longitude, "Fetching current weather");

        let response = self
            .retry_request(|| async { self.client.get(&url).send().await })
            .await?;

        match response.status() {
            StatusCode::OK => {
                let forecast = response.json::<ForecastResponse>().await?;
                let observed_at = NaiveDateTime::parse_from_str(&forecast.current.time, "%Y-%m-%dT%H:%M")
                    .map(|naive| naive.and_utc())
                    .unwrap_or_else(|_| Utc::now());

                Ok(CurrentConditions {
                    cloud_coverage_pct: forecast.current.cloud_cover,
                    temperature_c: forecast.current.temperature_2m,
                    precipitation_mm: forecast.current.precipitation,
                    observed_at,
                })
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                error!(status = status.as_u16(), %message, "Weather API error");
                Err(WeatherError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> WeatherResult<reqwest::Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if attempts >= self.max_retries => {
                    error!(attempts, error = %e, "Weather request failed, giving up");
                    return Err(WeatherError::HttpError(e));
                }
                Err(e) => {
                    warn!(
                        attempt = attempts,
                        max = self.max_retries,
                        error = %e,
                        "Weather request failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2; // Exponential backoff
                }
            }
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoClient {
    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> WeatherResult<CurrentConditions> {
        self.fetch_current(latitude, longitude).await
    }
}
