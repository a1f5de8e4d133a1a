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

//! Application configuration management.
//!
//! Persistent TOML configuration covering polling cadence, cache tuning,
//! and the fleet roster. The roster stands in for the fleet record store:
//! each entry names a tail number, its transponder address, and whether
//! live tracking is enabled for it.

use std::time::Duration;

use opensky_client::{CacheConfig, PollerConfig, SchedulerConfig, TrackedAircraft};
use serde::{Deserialize, Serialize};

/// One aircraft known to the fleet roster.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RosterEntry {
    /// Tail number (registration), the stable key.
    pub tail_number: String,

    /// ICAO 24-bit transponder address (hex string).
    pub icao24: String,

    /// Whether this aircraft is offered for live tracking.
    #[serde(default = "default_true")]
    pub tracking_enabled: bool,
}

/// Application configuration stored in TOML format.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    /// Configuration schema version for migrations.
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Interval between automatic refresh passes, in seconds.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Delay between consecutive provider requests, in milliseconds.
    #[serde(default = "default_request_spacing_ms")]
    pub request_spacing_ms: u64,

    /// Maximum aircraft shown in the compact live-flights view.
    #[serde(default = "default_max_live_flights")]
    pub max_live_flights: usize,

    /// Maximum entries in the frequently-accessed cache list.
    #[serde(default = "default_cache_max_frequent")]
    pub cache_max_frequent: usize,

    /// Maximum entries in the recent-search cache list.
    #[serde(default = "default_cache_max_recent")]
    pub cache_max_recent: usize,

    /// Days after which unused cache entries expire.
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,

    /// Known aircraft available for tracking.
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_request_spacing_ms() -> u64 {
    150
}

fn default_max_live_flights() -> usize {
    5
}

fn default_cache_max_frequent() -> usize {
    10
}

fn default_cache_max_recent() -> usize {
    20
}

fn default_cache_ttl_days() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_spacing_ms: default_request_spacing_ms(),
            max_live_flights: default_max_live_flights(),
            cache_max_frequent: default_cache_max_frequent(),
            cache_max_recent: default_cache_max_recent(),
            cache_ttl_days: default_cache_ttl_days(),
            roster: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating the default file if missing.
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load("skytrack", "config")
    }

    /// Get the config file path for display to user.
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path("skytrack", "config")
    }

    /// Roster entries with tracking enabled, as tracked aircraft.
    pub fn trackable(&self) -> Vec<TrackedAircraft> {
        self.roster
            .iter()
            .filter(|entry| entry.tracking_enabled)
            .map(|entry| TrackedAircraft::new(entry.tail_number.clone(), entry.icao24.clone()))
            .collect()
    }

    /// Scheduler configuration derived from the tuning knobs.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            poller: PollerConfig {
                request_spacing: Duration::from_millis(self.request_spacing_ms),
            },
        }
    }

    /// Cache configuration derived from the tuning knobs.
    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_frequent: self.cache_max_frequent,
            max_recent: self.cache_max_recent,
            entry_ttl_days: self.cache_ttl_days,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_usage() {
        let config = AppConfig::default();
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.request_spacing_ms, 150);
        assert_eq!(config.cache_max_frequent, 10);
        assert_eq!(config.cache_max_recent, 20);
        assert_eq!(config.cache_ttl_days, 30);
        assert!(config.roster.is_empty());
    }

    #[test]
    fn trackable_filters_disabled_entries() {
        let config = AppConfig {
            roster: vec![
                RosterEntry {
                    tail_number: "N1".to_string(),
                    icao24: "aaa".to_string(),
                    tracking_enabled: true,
                },
                RosterEntry {
                    tail_number: "N2".to_string(),
                    icao24: "bbb".to_string(),
                    tracking_enabled: false,
                },
            ],
            ..Default::default()
        };

        let trackable = config.trackable();
        assert_eq!(trackable.len(), 1);
        assert_eq!(trackable[0].tail_number, "N1");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            refresh_interval_secs = 45

            [[roster]]
            tail_number = "N123AB"
            icao24 = "a1b2c3"
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh_interval_secs, 45);
        assert_eq!(config.request_spacing_ms, 150);
        assert_eq!(config.roster.len(), 1);
        assert!(config.roster[0].tracking_enabled);
    }
}
