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

//! Client library for live flight tracking over the OpenSky REST API.
//!
//! Polls a rate-limited position-report service for a user-curated set of
//! aircraft, merges partial results into atomically-published snapshots, and
//! maintains a persisted usage-ranking cache for quick re-selection. The
//! layers can be used independently or composed:
//!
//! - **Provider layer**: one-request-per-aircraft state vector fetch with
//!   per-field null tolerance ([`provider`])
//! - **Poller layer**: strictly sequential, rate-limited batch passes
//!   ([`poller`])
//! - **Scheduler layer**: immediate-then-interval refresh with no
//!   overlapping passes ([`scheduler`])
//! - **Cache layer**: favorites, frequency, and recency ranking with
//!   pluggable persistence ([`cache`])
//! - **View layer**: pure status/selection transforms ([`view`])
//!
//! # Quick Start
//!
//! Use [`TrackingClient`] for full-stack operation:
//!
//! ```no_run
//! use opensky_client::{
//!     OpenSkyClient, TrackedAircraft, TrackingClient, TrackingClientConfig,
//! };
//! use opensky_client::cache::MemoryStorage;
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = TrackingClient::spawn(
//!         OpenSkyClient::new(),
//!         Box::new(MemoryStorage::new()),
//!         TrackingClientConfig::default(),
//!     );
//!
//!     client.add_aircraft(TrackedAircraft::new("N123AB", "a1b2c3"));
//!
//!     let mut snapshots = client.subscribe();
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow().clone();
//!         println!("{} aircraft polled", snapshot.len());
//!     }
//! }
//! ```

pub mod cache;
pub mod poller;
pub mod provider;
pub mod scheduler;
pub mod view;

use std::sync::Mutex;

use tokio::sync::watch;

pub use cache::{AffinityCache, CacheConfig, CacheStats, CacheStorage, Suggestion, SuggestionKind};
pub use poller::{Poller, PollerConfig, Snapshot, TrackedAircraft};
pub use provider::{OpenSkyClient, ProviderError, StateVector, TelemetryFetch};
pub use scheduler::{RefreshScheduler, SchedulerConfig};
pub use view::{FlightStatus, StatusFilter};

/// Configuration for the full-stack tracking client.
#[derive(Debug, Clone, Default)]
pub struct TrackingClientConfig {
    /// Scheduler configuration (refresh interval, request spacing).
    pub scheduler: SchedulerConfig,
    /// Affinity cache configuration (caps, TTL, decay).
    pub cache: CacheConfig,
}

/// Full-stack tracking client wiring the scheduler and the affinity cache.
///
/// Owns the tracked set. [`add_aircraft`](Self::add_aircraft) is the single
/// entry point for "track this aircraft": it records the cache access
/// exactly once and pushes the updated set to the scheduler, which polls
/// immediately.
pub struct TrackingClient {
    scheduler: RefreshScheduler,
    cache: Mutex<AffinityCache>,
    tracked: Mutex<Vec<TrackedAircraft>>,
}

impl std::fmt::Debug for TrackingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingClient")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl TrackingClient {
    /// Spawn the background scheduler and load the affinity cache from the
    /// given storage backend.
    #[must_use]
    pub fn spawn<F>(
        fetcher: F,
        storage: Box<dyn CacheStorage>,
        config: TrackingClientConfig,
    ) -> Self
    where
        F: TelemetryFetch + Send + Sync + 'static,
    {
        Self {
            scheduler: RefreshScheduler::spawn(fetcher, config.scheduler),
            cache: Mutex::new(AffinityCache::new(storage, config.cache)),
            tracked: Mutex::new(Vec::new()),
        }
    }

    /// Add an aircraft to the tracked set.
    ///
    /// Returns `false` without side effects when the tail number is already
    /// tracked. Otherwise records one cache access and triggers an immediate
    /// poll of the new set.
    pub fn add_aircraft(&self, aircraft: TrackedAircraft) -> bool {
        let mut tracked = self.lock_tracked();
        if tracked
            .iter()
            .any(|a| a.tail_number == aircraft.tail_number)
        {
            return false;
        }

        self.lock_cache()
            .record_access(&aircraft.tail_number, &aircraft.icao24);
        tracked.push(aircraft);
        self.scheduler.set_tracked(tracked.clone());
        true
    }

    /// Remove an aircraft from the tracked set.
    ///
    /// Returns `false` when the tail number was not tracked.
    pub fn remove_aircraft(&self, tail_number: &str) -> bool {
        let mut tracked = self.lock_tracked();
        let Some(index) = tracked.iter().position(|a| a.tail_number == tail_number) else {
            return false;
        };
        tracked.remove(index);
        self.scheduler.set_tracked(tracked.clone());
        true
    }

    /// Snapshot of the current tracked set.
    #[must_use]
    pub fn tracked(&self) -> Vec<TrackedAircraft> {
        self.lock_tracked().clone()
    }

    /// Subscribe to published snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.scheduler.subscribe()
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn latest_snapshot(&self) -> Snapshot {
        self.scheduler.latest()
    }

    /// Request a refresh now (skipped if a pass is already running).
    pub fn trigger_refresh(&self) {
        self.scheduler.trigger_now();
    }

    /// Flip favorite membership; returns the new membership.
    pub fn toggle_favorite(&self, tail_number: &str) -> bool {
        self.lock_cache().toggle_favorite(tail_number)
    }

    /// Whether a tail number is favorited.
    #[must_use]
    pub fn is_favorite(&self, tail_number: &str) -> bool {
        self.lock_cache().is_favorite(tail_number)
    }

    /// Merged quick-access suggestions (favorites > frequent > recent).
    #[must_use]
    pub fn quick_access_suggestions(&self) -> Vec<Suggestion> {
        self.lock_cache().quick_access_suggestions()
    }

    /// Affinity cache summary counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    /// Reset the affinity cache and remove its persisted state.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Shut down the background scheduler.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, AffinityCache> {
        self.cache
            .lock()
            .expect("Affinity cache lock poisoned - unrecoverable state")
    }

    fn lock_tracked(&self) -> std::sync::MutexGuard<'_, Vec<TrackedAircraft>> {
        self.tracked
            .lock()
            .expect("Tracked set lock poisoned - unrecoverable state")
    }
}
