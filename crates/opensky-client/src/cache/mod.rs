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

//! Usage-ranking cache for tracked aircraft.
//!
//! Remembers which aircraft a user interacts with and ranks them for quick
//! re-selection: a decay-scored frequently-accessed list, a most-recent-first
//! search list, and a favorites set. The whole structure is persisted through
//! an injected [`CacheStorage`] backend on every mutation and loaded once at
//! construction, pruning entries older than the configured TTL.
//!
//! Persistence failures never surface to callers: they are logged and the
//! in-memory cache keeps working for the rest of the session. A corrupt
//! persisted blob is discarded in favor of an empty cache.

mod storage;

pub use storage::{CacheStorage, FileStorage, MemoryStorage, StorageError};

use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const FREQUENT_SUGGESTION_LIMIT: usize = 5;
const RECENT_SUGGESTION_LIMIT: usize = 3;

/// Configuration for cache caps, expiry, and scoring.
///
/// The defaults match observed usage; none of them is a hard invariant.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entries kept in the frequently-accessed list.
    pub max_frequent: usize,
    /// Maximum entries kept in the recent-search list.
    pub max_recent: usize,
    /// Frequently-accessed entries older than this are pruned on load.
    pub entry_ttl_days: i64,
    /// Score penalty per day since last access.
    pub decay_per_day: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_frequent: 10,
            max_recent: 20,
            entry_ttl_days: 30,
            decay_per_day: 0.1,
        }
    }
}

/// One aircraft's accumulated usage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityRecord {
    pub tail_number: String,
    pub icao24: String,
    /// Epoch milliseconds of the most recent access.
    pub last_accessed: i64,
    /// Number of accesses while the record has been retained.
    pub access_count: u32,
}

impl AffinityRecord {
    /// Recency-decayed ranking score at the given time.
    fn score(&self, now_ms: i64, decay_per_day: f64) -> f64 {
        let age_days = (now_ms - self.last_accessed) as f64 / MILLIS_PER_DAY;
        f64::from(self.access_count) - decay_per_day * age_days
    }
}

/// Which group a quick-access suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Favorite,
    Frequent,
    Recent,
}

/// One entry of the merged quick-access list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub tail_number: String,
    pub kind: SuggestionKind,
}

/// Summary counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub favorites_count: usize,
    pub frequent_count: usize,
    pub recent_count: usize,
    /// Sum of access counts over the retained frequently-accessed records
    /// (the capped subset, not a lifetime counter).
    pub total_access_count: u64,
}

/// Persisted shape of the cache.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheBlob {
    #[serde(default)]
    frequently_accessed: Vec<AffinityRecord>,
    #[serde(default)]
    recent_searches: Vec<String>,
    #[serde(default)]
    favorites: Vec<String>,
}

/// The affinity cache. Single-writer, process-wide; concurrent writers from
/// another process may lose updates, which is acceptable for a best-effort
/// ranking store.
pub struct AffinityCache {
    blob: CacheBlob,
    config: CacheConfig,
    storage: Box<dyn CacheStorage>,
}

impl std::fmt::Debug for AffinityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AffinityCache")
            .field("frequent", &self.blob.frequently_accessed.len())
            .field("recent", &self.blob.recent_searches.len())
            .field("favorites", &self.blob.favorites.len())
            .finish_non_exhaustive()
    }
}

impl AffinityCache {
    /// Load the cache from the given storage backend.
    ///
    /// A missing, unreadable, or corrupt blob yields an empty cache rather
    /// than an error; frequently-accessed entries past the TTL are dropped.
    #[must_use]
    pub fn new(storage: Box<dyn CacheStorage>, config: CacheConfig) -> Self {
        let mut blob = match storage.load() {
            Ok(Some(raw)) => match serde_json::from_str::<CacheBlob>(&raw) {
                Ok(blob) => blob,
                Err(e) => {
                    warn!("Discarding corrupt affinity cache: {}", e);
                    CacheBlob::default()
                }
            },
            Ok(None) => CacheBlob::default(),
            Err(e) => {
                warn!("Failed to load affinity cache: {}", e);
                CacheBlob::default()
            }
        };

        let cutoff = Utc::now().timestamp_millis() - config.entry_ttl_days * 24 * 60 * 60 * 1000;
        blob.frequently_accessed
            .retain(|record| record.last_accessed >= cutoff);

        Self {
            blob,
            config,
            storage,
        }
    }

    /// Record one access to an aircraft.
    ///
    /// This is the sole mutation entry point for usage tracking: every
    /// "track this aircraft" action calls it exactly once. Updates the
    /// frequently-accessed ranking and pushes the tail number onto the
    /// recent-search list, then persists.
    pub fn record_access(&mut self, tail_number: &str, icao24: &str) {
        self.record_access_at(tail_number, icao24, Utc::now().timestamp_millis());
    }

    fn record_access_at(&mut self, tail_number: &str, icao24: &str, now_ms: i64) {
        match self
            .blob
            .frequently_accessed
            .iter_mut()
            .find(|record| record.tail_number == tail_number)
        {
            Some(record) => {
                record.last_accessed = now_ms;
                record.access_count += 1;
            }
            None => self.blob.frequently_accessed.push(AffinityRecord {
                tail_number: tail_number.to_string(),
                icao24: icao24.to_string(),
                last_accessed: now_ms,
                access_count: 1,
            }),
        }

        let decay = self.config.decay_per_day;
        self.blob.frequently_accessed.sort_by(|a, b| {
            b.score(now_ms, decay)
                .total_cmp(&a.score(now_ms, decay))
                .then(b.last_accessed.cmp(&a.last_accessed))
        });
        self.blob.frequently_accessed.truncate(self.config.max_frequent);

        self.blob.recent_searches.retain(|t| t != tail_number);
        self.blob.recent_searches.insert(0, tail_number.to_string());
        self.blob.recent_searches.truncate(self.config.max_recent);

        self.persist();
    }

    /// Flip favorite membership for a tail number.
    ///
    /// Returns the new membership: `true` when added, `false` when removed.
    pub fn toggle_favorite(&mut self, tail_number: &str) -> bool {
        let added = match self
            .blob
            .favorites
            .iter()
            .position(|t| t == tail_number)
        {
            Some(index) => {
                self.blob.favorites.remove(index);
                false
            }
            None => {
                self.blob.favorites.push(tail_number.to_string());
                true
            }
        };

        self.persist();
        added
    }

    /// Whether a tail number is favorited.
    #[must_use]
    pub fn is_favorite(&self, tail_number: &str) -> bool {
        self.blob.favorites.iter().any(|t| t == tail_number)
    }

    /// Snapshot of the frequently-accessed records in ranked order.
    #[must_use]
    pub fn frequently_accessed(&self) -> Vec<AffinityRecord> {
        self.blob.frequently_accessed.clone()
    }

    /// Snapshot of the recent-search tail numbers, most recent first.
    #[must_use]
    pub fn recent_searches(&self) -> Vec<String> {
        self.blob.recent_searches.clone()
    }

    /// Snapshot of the favorite tail numbers, in insertion order.
    #[must_use]
    pub fn favorites(&self) -> Vec<String> {
        self.blob.favorites.clone()
    }

    /// Merged quick-access list in priority order: every favorite, then up
    /// to five frequently-accessed aircraft not already favorited, then up
    /// to three recent searches not already listed. No tail number appears
    /// twice.
    #[must_use]
    pub fn quick_access_suggestions(&self) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = self
            .blob
            .favorites
            .iter()
            .map(|tail_number| Suggestion {
                tail_number: tail_number.clone(),
                kind: SuggestionKind::Favorite,
            })
            .collect();

        let frequent: Vec<Suggestion> = self
            .blob
            .frequently_accessed
            .iter()
            .filter(|record| !self.is_favorite(&record.tail_number))
            .take(FREQUENT_SUGGESTION_LIMIT)
            .map(|record| Suggestion {
                tail_number: record.tail_number.clone(),
                kind: SuggestionKind::Frequent,
            })
            .collect();
        suggestions.extend(frequent);

        let recent: Vec<Suggestion> = self
            .blob
            .recent_searches
            .iter()
            .filter(|tail_number| !suggestions.iter().any(|s| &s.tail_number == *tail_number))
            .take(RECENT_SUGGESTION_LIMIT)
            .map(|tail_number| Suggestion {
                tail_number: tail_number.clone(),
                kind: SuggestionKind::Recent,
            })
            .collect();
        suggestions.extend(recent);

        suggestions
    }

    /// Summary counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            favorites_count: self.blob.favorites.len(),
            frequent_count: self.blob.frequently_accessed.len(),
            recent_count: self.blob.recent_searches.len(),
            total_access_count: self
                .blob
                .frequently_accessed
                .iter()
                .map(|record| u64::from(record.access_count))
                .sum(),
        }
    }

    /// Reset to empty and remove the persisted blob.
    pub fn clear(&mut self) {
        self.blob = CacheBlob::default();
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear persisted affinity cache: {}", e);
        }
    }

    fn persist(&self) {
        let raw = match serde_json::to_string(&self.blob) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize affinity cache: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.save(&raw) {
            warn!("Failed to persist affinity cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStorage;

    impl CacheStorage for FailingStorage {
        fn load(&self) -> Result<Option<String>, StorageError> {
            Err(StorageError::NoDataDir)
        }

        fn save(&self, _blob: &str) -> Result<(), StorageError> {
            Err(StorageError::NoDataDir)
        }

        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::NoDataDir)
        }
    }

    fn empty_cache() -> AffinityCache {
        AffinityCache::new(Box::new(MemoryStorage::new()), CacheConfig::default())
    }

    #[test]
    fn record_access_creates_then_increments() {
        let mut cache = empty_cache();

        cache.record_access_at("N123AB", "a1b2c3", 1_000);
        let records = cache.frequently_accessed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].access_count, 1);
        assert_eq!(records[0].last_accessed, 1_000);
        assert_eq!(records[0].icao24, "a1b2c3");

        cache.record_access_at("N123AB", "a1b2c3", 2_000);
        let records = cache.frequently_accessed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].access_count, 2);
        assert_eq!(records[0].last_accessed, 2_000);
    }

    #[test]
    fn access_count_tracks_number_of_calls() {
        let mut cache = empty_cache();
        for i in 0..7 {
            cache.record_access_at("N1", "aaa", i * 100);
        }
        assert_eq!(cache.frequently_accessed()[0].access_count, 7);
    }

    #[test]
    fn frequent_list_capped_and_stalest_evicted() {
        let mut cache = empty_cache();
        for i in 0..11 {
            let tail = format!("N{}", i);
            cache.record_access_at(&tail, "addr", i64::from(i) * 1_000);
        }

        let records = cache.frequently_accessed();
        assert_eq!(records.len(), 10);
        // Equal access counts: the oldest access (N0) loses the tie-break.
        assert!(!records.iter().any(|r| r.tail_number == "N0"));
        assert!(records.iter().any(|r| r.tail_number == "N10"));
    }

    #[test]
    fn higher_access_count_outranks_recency_within_decay() {
        let mut cache = empty_cache();
        cache.record_access_at("N1", "aaa", 0);
        cache.record_access_at("N1", "aaa", 1_000);
        cache.record_access_at("N2", "bbb", 2_000);

        let records = cache.frequently_accessed();
        assert_eq!(records[0].tail_number, "N1");
        assert_eq!(records[1].tail_number, "N2");
    }

    #[test]
    fn recent_searches_mru_deduplicated_and_capped() {
        let mut cache = empty_cache();
        for i in 0..25 {
            cache.record_access_at(&format!("N{}", i), "addr", i64::from(i));
        }
        cache.record_access_at("N24", "addr", 100);
        cache.record_access_at("N5", "addr", 101);

        let recent = cache.recent_searches();
        assert_eq!(recent.len(), 20);
        assert_eq!(recent[0], "N5");
        assert_eq!(recent[1], "N24");
        assert_eq!(recent.iter().filter(|t| *t == "N24").count(), 1);
    }

    #[test]
    fn toggle_favorite_is_involutive() {
        let mut cache = empty_cache();

        assert!(cache.toggle_favorite("N123AB"));
        assert!(cache.is_favorite("N123AB"));
        assert!(!cache.toggle_favorite("N123AB"));
        assert!(!cache.is_favorite("N123AB"));
    }

    #[test]
    fn suggestions_ordered_and_unique() {
        let mut cache = empty_cache();
        for i in 0..8 {
            cache.record_access_at(&format!("N{}", i), "addr", i64::from(i) * 1_000);
        }
        cache.toggle_favorite("N3");
        cache.toggle_favorite("N7");

        let suggestions = cache.quick_access_suggestions();

        // Favorites first, then frequent, then recent; no duplicates.
        let mut seen = std::collections::HashSet::new();
        for s in &suggestions {
            assert!(seen.insert(s.tail_number.clone()), "duplicate {}", s.tail_number);
        }
        let first_frequent = suggestions
            .iter()
            .position(|s| s.kind == SuggestionKind::Frequent);
        let last_favorite = suggestions
            .iter()
            .rposition(|s| s.kind == SuggestionKind::Favorite);
        if let (Some(ff), Some(lf)) = (first_frequent, last_favorite) {
            assert!(lf < ff);
        }
        let first_recent = suggestions
            .iter()
            .position(|s| s.kind == SuggestionKind::Recent);
        let last_frequent = suggestions
            .iter()
            .rposition(|s| s.kind == SuggestionKind::Frequent);
        if let (Some(fr), Some(lf)) = (first_recent, last_frequent) {
            assert!(lf < fr);
        }

        // Favorites are never repeated under another kind.
        assert_eq!(
            suggestions
                .iter()
                .filter(|s| s.tail_number == "N3" || s.tail_number == "N7")
                .count(),
            2
        );

        // Group limits: at most 5 frequent and 3 recent.
        assert!(
            suggestions
                .iter()
                .filter(|s| s.kind == SuggestionKind::Frequent)
                .count()
                <= 5
        );
        assert!(
            suggestions
                .iter()
                .filter(|s| s.kind == SuggestionKind::Recent)
                .count()
                <= 3
        );
    }

    #[test]
    fn getters_are_idempotent() {
        let mut cache = empty_cache();
        cache.record_access_at("N1", "aaa", 1_000);
        cache.toggle_favorite("N2");

        assert_eq!(cache.frequently_accessed(), cache.frequently_accessed());
        assert_eq!(cache.recent_searches(), cache.recent_searches());
        assert_eq!(cache.favorites(), cache.favorites());
        assert_eq!(cache.quick_access_suggestions(), cache.quick_access_suggestions());
    }

    #[test]
    fn stats_sum_capped_subset() {
        let mut cache = empty_cache();
        cache.record_access_at("N1", "aaa", 1_000);
        cache.record_access_at("N1", "aaa", 2_000);
        cache.record_access_at("N2", "bbb", 3_000);
        cache.toggle_favorite("N9");

        let stats = cache.stats();
        assert_eq!(stats.favorites_count, 1);
        assert_eq!(stats.frequent_count, 2);
        assert_eq!(stats.recent_count, 2);
        assert_eq!(stats.total_access_count, 3);
    }

    #[test]
    fn corrupt_blob_loads_as_empty() {
        let storage = MemoryStorage::with_blob("{not json");
        let cache = AffinityCache::new(Box::new(storage), CacheConfig::default());

        assert!(cache.frequently_accessed().is_empty());
        assert!(cache.recent_searches().is_empty());
        assert!(cache.favorites().is_empty());
    }

    #[test]
    fn expired_entries_pruned_on_load() {
        let now = Utc::now().timestamp_millis();
        let day = 24 * 60 * 60 * 1000;
        let blob = serde_json::json!({
            "frequently_accessed": [
                { "tail_number": "OLD", "icao24": "aaa", "last_accessed": now - 31 * day, "access_count": 9 },
                { "tail_number": "NEW", "icao24": "bbb", "last_accessed": now - day, "access_count": 1 }
            ],
            "recent_searches": ["OLD", "NEW"],
            "favorites": ["OLD"]
        });
        let storage = MemoryStorage::with_blob(blob.to_string());
        let cache = AffinityCache::new(Box::new(storage), CacheConfig::default());

        let records = cache.frequently_accessed();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].tail_number, "NEW");
        // Only the frequent list expires; recents and favorites persist.
        assert_eq!(cache.recent_searches().len(), 2);
        assert!(cache.is_favorite("OLD"));
    }

    #[test]
    fn persisted_blob_survives_reload() {
        let storage = MemoryStorage::new();
        let raw = {
            let mut cache =
                AffinityCache::new(Box::new(MemoryStorage::new()), CacheConfig::default());
            cache.record_access("N1", "aaa");
            cache.toggle_favorite("N1");
            serde_json::to_string(&cache.blob).unwrap()
        };
        storage.save(&raw).unwrap();

        let cache = AffinityCache::new(Box::new(storage), CacheConfig::default());
        assert_eq!(cache.frequently_accessed().len(), 1);
        assert!(cache.is_favorite("N1"));
    }

    #[test]
    fn storage_failures_do_not_break_the_session() {
        let mut cache = AffinityCache::new(Box::new(FailingStorage), CacheConfig::default());

        cache.record_access_at("N1", "aaa", 1_000);
        assert!(cache.toggle_favorite("N1"));
        cache.clear();
        cache.record_access_at("N2", "bbb", 2_000);

        assert_eq!(cache.frequently_accessed().len(), 1);
        assert_eq!(cache.frequently_accessed()[0].tail_number, "N2");
    }

    #[test]
    fn clear_resets_everything() {
        let storage = Box::new(MemoryStorage::new());
        let mut cache = AffinityCache::new(storage, CacheConfig::default());
        cache.record_access_at("N1", "aaa", 1_000);
        cache.toggle_favorite("N1");

        cache.clear();

        assert!(cache.frequently_accessed().is_empty());
        assert!(cache.recent_searches().is_empty());
        assert!(cache.favorites().is_empty());
        assert_eq!(cache.stats().total_access_count, 0);
    }
}
