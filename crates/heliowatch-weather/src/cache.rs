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

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use heliowatch_types::CurrentConditions;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::WeatherResult;

/// Source of current weather conditions at a coordinate pair.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> WeatherResult<CurrentConditions>;
}

/// Coordinates rounded to two decimal places (~1 km); units on the same
/// roof share one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    lat_centi: i64,
    lon_centi: i64,
}

impl CacheKey {
    #[expect(clippy::cast_possible_truncation, reason = "coordinates fit i64 centidegrees")]
    fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            lat_centi: (latitude * 100.0).round() as i64,
            lon_centi: (longitude * 100.0).round() as i64,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    conditions: CurrentConditions,
    fetched_at: Instant,
}

/// TTL cache in front of a weather provider.
///
/// Fresh entries are served without touching the provider. When a fetch
/// fails and an expired entry is still around, the stale entry is returned
/// instead of the error; ingestion prefers slightly old weather over none.
pub struct WeatherCache {
    provider: Arc<dyn WeatherProvider>,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl std::fmt::Debug for WeatherCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCache")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl WeatherCache {
    pub fn new(provider: Arc<dyn WeatherProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    async fn lookup(&self, latitude: f64, longitude: f64) -> WeatherResult<CurrentConditions> {
        let key = CacheKey::new(latitude, longitude);

        // The lock is never held across the provider await
        let stale = {
            let entries = self.entries.lock();
            match entries.get(&key) {
                Some(entry) if entry.fetched_at.elapsed() < self.ttl => {
                    debug!(latitude, longitude, "Weather cache hit");
                    return Ok(entry.conditions);
                }
                other => other.cloned(),
            }
        };

        match self.provider.current_conditions(latitude, longitude).await {
            Ok(conditions) => {
                self.entries.lock().insert(
                    key,
                    CacheEntry {
                        conditions,
                        fetched_at: Instant::now(),
                    },
                );
                Ok(conditions)
            }
            Err(e) => match stale {
                Some(entry) => {
                    warn!(
                        latitude,
                        longitude,
                        error = %e,
                        "Weather fetch failed, serving stale conditions"
                    );
                    Ok(entry.conditions)
                }
                None => Err(e),
            },
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherCache {
    async fn current_conditions(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> WeatherResult<CurrentConditions> {
        self.lookup(latitude, longitude).await
    }
}
