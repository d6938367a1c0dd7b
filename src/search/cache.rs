//! In-memory search result cache with TTL expiry and batched LRU eviction

use crate::metrics::{SEARCH_CACHE_ENTRIES, SEARCH_CACHE_EVICTIONS_TOTAL};
use crate::search::result::SearchResponse;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_seconds: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

struct CacheEntry {
    response: SearchResponse,
    inserted_at: Instant,
    last_access: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    tick: u64,
    hits: u64,
    misses: u64,
}

impl CacheState {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn purge_expired(&mut self, ttl: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        let expired = before - self.entries.len();
        if expired > 0 {
            debug!(expired, remaining = self.entries.len(), "Purged expired cache entries");
        }
    }

    fn evict_least_recent(&mut self, count: usize) {
        let mut by_access: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, key.clone()))
            .collect();
        by_access.sort_unstable();

        for (_, key) in by_access.into_iter().take(count) {
            self.entries.remove(&key);
        }

        SEARCH_CACHE_EVICTIONS_TOTAL.inc_by(count as f64);
        debug!(evicted = count, remaining = self.entries.len(), "Evicted least recently used cache entries");
    }
}

/// Search result cache
///
/// Entries expire `ttl` after insertion. Expired entries are dropped lazily
/// on every `get`, `put` and `stats`. Inserting a new key into a full cache
/// first evicts the least recently accessed fifth of the capacity (at least
/// one entry).
pub struct SearchCache {
    state: Mutex<CacheState>,
    max_entries: usize,
    ttl: Duration,
}

impl SearchCache {
    pub fn new(max_entries: usize, ttl_seconds: u64) -> Self {
        Self::with_ttl(max_entries, Duration::from_secs(ttl_seconds))
    }

    pub fn with_ttl(max_entries: usize, ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Look up a cached response; hits come back with `cache_hit` set
    pub fn get(&self, key: &str) -> Option<SearchResponse> {
        let mut state = self.state.lock();
        state.purge_expired(self.ttl);

        let tick = state.next_tick();
        let found = state.entries.get_mut(key).map(|entry| {
            entry.last_access = tick;
            let mut response = entry.response.clone();
            response.cache_hit = true;
            response
        });

        if found.is_some() {
            state.hits += 1;
        } else {
            state.misses += 1;
        }
        SEARCH_CACHE_ENTRIES.set(state.entries.len() as f64);
        found
    }

    /// Store a response under `key`
    pub fn put(&self, key: impl Into<String>, response: SearchResponse) {
        let key = key.into();
        let mut state = self.state.lock();
        state.purge_expired(self.ttl);

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            let batch = (self.max_entries / 5).max(1);
            state.evict_least_recent(batch);
        }

        let tick = state.next_tick();
        state.entries.insert(
            key,
            CacheEntry {
                response,
                inserted_at: Instant::now(),
                last_access: tick,
            },
        );
        SEARCH_CACHE_ENTRIES.set(state.entries.len() as f64);
    }

    /// Drop every entry; hit/miss counters are kept
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        SEARCH_CACHE_ENTRIES.set(0.0);
    }

    pub fn stats(&self) -> CacheStats {
        let mut state = self.state.lock();
        state.purge_expired(self.ttl);

        let lookups = state.hits + state.misses;
        CacheStats {
            entries: state.entries.len(),
            max_entries: self.max_entries,
            ttl_seconds: self.ttl.as_secs(),
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
