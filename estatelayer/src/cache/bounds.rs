//! Tile-keyed bounds cache with TTL and durable persistence.
//!
//! The cache maps (coarse tile × filter) to the listings last fetched for
//! that tile. Lookups consult an in-memory map first and fall back to the
//! durable store, promoting hits into memory. Entries expire after a TTL;
//! expired entries are removed lazily on read. A shorter staleness
//! threshold marks entries that are still usable but old enough to warrant
//! a background refresh; that decision belongs to the orchestrator, the
//! cache only answers the predicate.
//!
//! Durable-store write failures (quota pressure) are swallowed: the
//! in-memory write still succeeds and a best-effort sweep reclaims space
//! by dropping expired entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geo::BoundingBox;
use crate::listing::{ListingFilter, PropertyRecord};
use crate::store::KeyValueStore;

use super::key::coarse_key;

/// One cached record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Records fetched for this tile. Replaced wholesale on refresh.
    pub records: Vec<PropertyRecord>,
    /// When the records were fetched. Non-decreasing for a given key.
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry at `now`. Clock skew clamps to zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.fetched_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Whether the entry has outlived `ttl` at `now`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) >= ttl
    }

    /// Whether a still-valid entry is old enough to refresh in the background.
    pub fn is_stale(&self, stale_after: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) >= stale_after
    }
}

/// Tile-keyed listing cache: in-memory map plus optional durable store.
///
/// All time-dependent operations take `now` explicitly so tests can probe
/// TTL boundaries without sleeping.
pub struct BoundsCache {
    memory: HashMap<String, CacheEntry>,
    store: Option<Arc<dyn KeyValueStore>>,
    ttl: Duration,
}

impl BoundsCache {
    /// Create a memory-only cache with the given TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            memory: HashMap::new(),
            store: None,
            ttl,
        }
    }

    /// Create a cache that persists entries into `store`.
    pub fn with_store(ttl: Duration, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            memory: HashMap::new(),
            store: Some(store),
            ttl,
        }
    }

    /// The configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries currently held in memory.
    pub fn entry_count(&self) -> usize {
        self.memory.len()
    }

    /// Look up the entry for a viewport.
    ///
    /// Returns `None` if no entry exists or the entry's TTL has elapsed.
    /// Expired entries are removed from both layers on the way out;
    /// durable-only hits are promoted into memory.
    pub fn get(
        &mut self,
        bounds: &BoundingBox,
        filter: &ListingFilter,
        now: DateTime<Utc>,
    ) -> Option<&CacheEntry> {
        let key = coarse_key(bounds, filter);
        self.get_by_key(&key, now)
    }

    /// Look up an entry by a precomputed coarse key.
    pub fn get_by_key(&mut self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry> {
        let expired = self
            .memory
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.ttl, now));
        if expired {
            self.memory.remove(key);
            if let Some(store) = &self.store {
                store.remove(key);
            }
        }
        if !self.memory.contains_key(key) {
            self.promote_from_store(key, now);
        }
        self.memory.get(key)
    }

    /// Write records for a viewport into both cache layers.
    pub fn set(
        &mut self,
        bounds: &BoundingBox,
        filter: &ListingFilter,
        records: Vec<PropertyRecord>,
        now: DateTime<Utc>,
    ) {
        let key = coarse_key(bounds, filter);
        self.set_by_key(key, records, now);
    }

    /// Write records under a precomputed coarse key.
    ///
    /// The durable write is best-effort: a failure is logged, triggers an
    /// expired-entry sweep of the store, and leaves the in-memory write
    /// intact.
    pub fn set_by_key(&mut self, key: String, records: Vec<PropertyRecord>, now: DateTime<Utc>) {
        let entry = CacheEntry {
            records,
            fetched_at: now,
        };
        if let Some(store) = self.store.clone() {
            match serde_json::to_string(&entry) {
                Ok(raw) => {
                    if let Err(e) = store.set(&key, raw) {
                        warn!(error = %e, key = %key, "Durable cache write failed, sweeping expired entries");
                        self.sweep_store(now);
                    }
                }
                Err(e) => {
                    warn!(error = %e, key = %key, "Failed to encode cache entry for storage");
                }
            }
        }
        self.memory.insert(key, entry);
    }

    /// Drop expired entries from both layers.
    pub fn sweep(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.memory.retain(|_, entry| !entry.is_expired(ttl, now));
        self.sweep_store(now);
    }

    /// Drop every entry from memory and durable storage.
    ///
    /// Explicit cache-busting only; never called on the hit/miss path.
    pub fn clear_all(&mut self) {
        self.memory.clear();
        if let Some(store) = &self.store {
            for key in store.keys() {
                store.remove(&key);
            }
        }
    }

    fn promote_from_store(&mut self, key: &str, now: DateTime<Utc>) {
        let Some(store) = &self.store else {
            return;
        };
        let Some(raw) = store.get(key) else {
            return;
        };
        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if !entry.is_expired(self.ttl, now) => {
                self.memory.insert(key.to_owned(), entry);
            }
            Ok(_) => {
                // Lazy expiry: reading an expired durable entry removes it.
                store.remove(key);
            }
            Err(e) => {
                warn!(error = %e, key = %key, "Dropping undecodable cache entry");
                store.remove(key);
            }
        }
    }

    fn sweep_store(&self, now: DateTime<Utc>) {
        let Some(store) = &self.store else {
            return;
        };
        let mut removed = 0usize;
        for key in store.keys() {
            let Some(raw) = store.get(&key) else {
                continue;
            };
            let drop = match serde_json::from_str::<CacheEntry>(&raw) {
                Ok(entry) => entry.is_expired(self.ttl, now),
                Err(_) => true,
            };
            if drop {
                store.remove(&key);
                removed += 1;
            }
        }
        debug!(removed, "Swept expired durable cache entries");
    }
}
