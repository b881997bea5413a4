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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct ReadingIngestRequest {
    pub unit_id: String,
    pub shared_secret: String,
    /// Samples may arrive out of order; the server stores each one as-is.
    pub samples: Vec<ReadingSample>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ReadingSample {
    pub taken_at: DateTime<Utc>,
    /// Energy generated since the previous sample, in kWh
    pub energy_kwh: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub server_time: DateTime<Utc>,
    /// How many samples were stored
    pub accepted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
