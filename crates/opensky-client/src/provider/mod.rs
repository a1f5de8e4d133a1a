// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provider layer for fetching live state vectors from the OpenSky REST API.
//!
//! One request per aircraft: `GET /states/all?icao24=<address>` returns either
//! an empty result set or a single positional state vector row. An empty
//! result is a valid "no current data" outcome (aircraft powered down or out
//! of coverage), not an error. Every field of the row may be null
//! independently and is tolerated.
//!
//! Values pass through in provider units (metres, metres per second);
//! conversion for display belongs to the consumer.

use std::future::Future;
use std::pin::Pin;

use log::warn;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Default base URL for the OpenSky Network REST API.
pub const DEFAULT_BASE_URL: &str = "https://opensky-network.org/api";

/// Errors that can occur while fetching a state vector.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// A single positional state vector as reported by the provider.
///
/// Field order and meaning follow the OpenSky `/states/all` row format.
/// Any field may be absent; only `icao24` identifies the row.
#[derive(Debug, Clone, PartialEq)]
pub struct StateVector {
    /// ICAO 24-bit transponder address (hex string).
    pub icao24: String,
    /// Callsign, trimmed; `None` when blank or missing.
    pub callsign: Option<String>,
    /// Country of registration.
    pub origin_country: Option<String>,
    /// Unix timestamp of the last position report.
    pub time_position: Option<i64>,
    /// Unix timestamp of the last message of any kind.
    pub last_contact: i64,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Barometric altitude in metres.
    pub baro_altitude: Option<f64>,
    /// Whether the aircraft is on the ground.
    pub on_ground: bool,
    /// Ground speed in metres per second.
    pub velocity: Option<f64>,
    /// Track angle in degrees (0-360, north = 0).
    pub true_track: Option<f64>,
    /// Vertical rate in metres per second (positive = climb).
    pub vertical_rate: Option<f64>,
    /// Geometric altitude in metres.
    pub geo_altitude: Option<f64>,
    /// Transponder squawk code.
    pub squawk: Option<String>,
    /// Special position identification flag.
    pub spi: bool,
    /// Position source (0 = ADS-B, 1 = ASTERIX, 2 = MLAT).
    pub position_source: Option<i64>,
}

impl StateVector {
    /// Build a state vector from one positional response row, tolerating
    /// null or missing entries for every field.
    ///
    /// Indices follow the OpenSky `/states/all` row layout, which carries
    /// a sensors list at index 12; `geo_altitude` and the fields after it
    /// therefore start at 13.
    fn from_row(row: &[Value]) -> Self {
        Self {
            icao24: str_at(row, 0).unwrap_or_default(),
            callsign: str_at(row, 1),
            origin_country: str_at(row, 2),
            time_position: i64_at(row, 3),
            last_contact: i64_at(row, 4).unwrap_or(0),
            longitude: f64_at(row, 5),
            latitude: f64_at(row, 6),
            baro_altitude: f64_at(row, 7),
            on_ground: bool_at(row, 8).unwrap_or(false),
            velocity: f64_at(row, 9),
            true_track: f64_at(row, 10),
            vertical_rate: f64_at(row, 11),
            geo_altitude: f64_at(row, 13),
            squawk: str_at(row, 14),
            spi: bool_at(row, 15).unwrap_or(false),
            position_source: i64_at(row, 16),
        }
    }
}

fn f64_at(row: &[Value], index: usize) -> Option<f64> {
    row.get(index).and_then(Value::as_f64)
}

fn i64_at(row: &[Value], index: usize) -> Option<i64> {
    row.get(index).and_then(Value::as_i64)
}

fn bool_at(row: &[Value], index: usize) -> Option<bool> {
    row.get(index).and_then(Value::as_bool)
}

fn str_at(row: &[Value], index: usize) -> Option<String> {
    row.get(index)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Response envelope for `/states/all`.
#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[allow(dead_code, reason = "part of the provider wire format")]
    time: Option<i64>,
    states: Option<Vec<Vec<Value>>>,
}

/// Future type returned by [`TelemetryFetch::fetch_report`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Option<StateVector>> + Send + 'a>>;

/// Seam between the poller and the provider transport.
///
/// Implementations must never fail the caller: any transport or provider
/// error is reported as `None`, so a single aircraft's failure cannot abort
/// a batch pass.
pub trait TelemetryFetch {
    /// Fetch the current report for one transponder address.
    fn fetch_report<'a>(&'a self, icao24: &'a str) -> FetchFuture<'a>;
}

/// HTTP client for the OpenSky `/states/all` endpoint.
#[derive(Debug, Clone)]
pub struct OpenSkyClient {
    http: reqwest::Client,
    base_url: String,
}

impl OpenSkyClient {
    /// Create a client against the public OpenSky API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (used by tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the current state vector for one aircraft.
    ///
    /// Returns `Ok(None)` when the provider has no data for the address,
    /// which is a normal outcome for powered-down or out-of-coverage
    /// aircraft.
    pub async fn fetch_state(&self, icao24: &str) -> Result<Option<StateVector>, ProviderError> {
        let url = format!(
            "{}/states/all?icao24={}",
            self.base_url,
            icao24.to_lowercase()
        );

        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status()));
        }

        let body: StatesResponse = response.json().await?;

        let row = match body.states {
            Some(rows) if !rows.is_empty() => rows.into_iter().next(),
            _ => None,
        };

        Ok(row.map(|row| StateVector::from_row(&row)))
    }
}

impl Default for OpenSkyClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFetch for OpenSkyClient {
    fn fetch_report<'a>(&'a self, icao24: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match self.fetch_state(icao24).await {
                Ok(state) => state,
                Err(e) => {
                    warn!("State fetch failed for {}: {}", icao24, e);
                    None
                }
            }
        })
    }
}
