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

//! Current-conditions weather lookups for reading ingestion.
//!
//! The ingest path asks for the weather at a unit's coordinates whenever an
//! agent reports without weather fields. Lookups go through [`WeatherCache`],
//! which deduplicates nearby coordinates, respects a TTL and falls back to
//! stale data when the provider is down; the provider itself is the
//! Open-Meteo client in [`client`].

pub mod cache;
pub mod client;
pub mod error;

pub use cache::{WeatherCache, WeatherProvider};
pub use client::OpenMeteoClient;
pub use error::{WeatherError, WeatherResult};
