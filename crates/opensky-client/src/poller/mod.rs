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

//! Rate-limited polling over the tracked aircraft set.
//!
//! The poller issues exactly one provider request per tracked aircraft,
//! strictly sequentially, with a fixed spacing between consecutive requests
//! to stay under the provider's per-second ceiling. Individual failures are
//! independent: a `None` outcome for one aircraft never affects another, and
//! the resulting snapshot always carries one entry per input aircraft.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::provider::{StateVector, TelemetryFetch};

/// An aircraft selected for live tracking.
///
/// `tail_number` is the stable key used throughout the subsystem; `icao24`
/// is the provider-side transponder address. Both come from the fleet
/// record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedAircraft {
    pub tail_number: String,
    pub icao24: String,
}

impl TrackedAircraft {
    #[must_use]
    pub fn new(tail_number: impl Into<String>, icao24: impl Into<String>) -> Self {
        Self {
            tail_number: tail_number.into(),
            icao24: icao24.into(),
        }
    }
}

/// The complete result of one polling pass.
///
/// Maps tail number to the latest report, `None` meaning "no current data"
/// (a valid state, not a failure). Snapshots are immutable once built and
/// are only ever replaced wholesale, never patched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub states: HashMap<String, Option<StateVector>>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// An empty snapshot, used before the first pass completes.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            states: HashMap::new(),
            taken_at: Utc::now(),
        }
    }

    /// Look up the report for a tail number, flattening "not tracked" and
    /// "tracked but offline" into `None`.
    #[must_use]
    pub fn state(&self, tail_number: &str) -> Option<&StateVector> {
        self.states.get(tail_number).and_then(Option::as_ref)
    }

    /// Number of tracked aircraft covered by this snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Configuration for the poller.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Fixed delay between consecutive provider requests.
    pub request_spacing: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            request_spacing: Duration::from_millis(150),
        }
    }
}

/// Sequential, rate-limited poller producing snapshots.
#[derive(Debug)]
pub struct Poller<F> {
    fetcher: F,
    request_spacing: Duration,
}

impl<F: TelemetryFetch> Poller<F> {
    #[must_use]
    pub fn new(fetcher: F, config: PollerConfig) -> Self {
        Self {
            fetcher,
            request_spacing: config.request_spacing,
        }
    }

    /// Run one full pass over the tracked set.
    ///
    /// Requests are issued in list order, one at a time, with the configured
    /// spacing between them. The returned snapshot has exactly one entry per
    /// input aircraft regardless of how many requests fail. Cancellation is
    /// cooperative: it is honored between requests, so at most the in-flight
    /// request completes past the cancellation point; remaining aircraft are
    /// recorded as `None` (the caller discards the snapshot anyway).
    pub async fn poll_all(
        &self,
        tracked: &[TrackedAircraft],
        cancel_token: &CancellationToken,
    ) -> Snapshot {
        let mut states = HashMap::with_capacity(tracked.len());

        for (i, aircraft) in tracked.iter().enumerate() {
            if i > 0 && !cancel_token.is_cancelled() {
                tokio::select! {
                    () = sleep(self.request_spacing) => {}
                    () = cancel_token.cancelled() => {}
                }
            }

            if cancel_token.is_cancelled() {
                states.insert(aircraft.tail_number.clone(), None);
                continue;
            }

            let state = self.fetcher.fetch_report(&aircraft.icao24).await;
            debug!(
                "Polled {} ({}): {}",
                aircraft.tail_number,
                aircraft.icao24,
                if state.is_some() { "report" } else { "no data" }
            );
            states.insert(aircraft.tail_number.clone(), state);
        }

        Snapshot {
            states,
            taken_at: Utc::now(),
        }
    }
}
