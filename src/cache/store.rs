//! Cache Store Module
//!
//! Maps query names to upstream answers with a fixed TTL, lazy expiry and an
//! optional LRU capacity bound.

use std::collections::HashMap;
use std::sync::Arc;

use hickory_proto::op::Message;
use tokio::sync::Mutex;

use crate::cache::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// Cache handle shared between the server and every in-flight resolution.
pub type SharedCache = Arc<Mutex<CacheStore>>;

// == Cache Store ==
/// In-memory answer cache keyed by the exact queried name.
///
/// Expired entries are only removed when a lookup finds them; nothing sweeps
/// the map in the background.
#[derive(Debug)]
pub struct CacheStore {
    /// Query name -> cached answer
    entries: HashMap<String, CacheEntry>,
    /// Recency tracking, present only when a capacity bound is configured
    lru: Option<LruTracker>,
    stats: CacheStats,
    /// Maximum number of entries, 0 for unbounded
    max_entries: usize,
    /// TTL in seconds applied to every insertion
    ttl: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a store applying `ttl` seconds to every answer.
    ///
    /// `max_entries == 0` leaves the cache unbounded.
    pub fn new(max_entries: usize, ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            lru: (max_entries > 0).then(LruTracker::new),
            stats: CacheStats::new(),
            max_entries,
            ttl,
        }
    }

    /// Wraps the store for sharing across tasks.
    pub fn into_shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    // == Lookup ==
    /// Returns the cached answer for `domain` if it is still fresh.
    ///
    /// A stale entry is removed and reported as absent.
    pub fn lookup(&mut self, domain: &str) -> Option<Message> {
        self.lookup_at(domain, current_timestamp_ms())
    }

    /// [`lookup`](Self::lookup) evaluated at `now_ms`.
    pub fn lookup_at(&mut self, domain: &str, now_ms: u64) -> Option<Message> {
        let Some(entry) = self.entries.get(domain) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired_at(now_ms) {
            self.entries.remove(domain);
            if let Some(lru) = self.lru.as_mut() {
                lru.remove(domain);
            }
            self.stats.record_expiration();
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        let answer = entry.answer.clone();
        if let Some(lru) = self.lru.as_mut() {
            lru.touch(domain);
        }
        self.stats.record_hit();
        Some(answer)
    }

    // == Insert ==
    /// Stores `answer` for `domain`, replacing any previous entry.
    ///
    /// When the cache is bounded and full, the least recently used domain is
    /// evicted first. Overwriting an existing domain never evicts.
    pub fn insert(&mut self, domain: String, answer: Message) {
        self.insert_at(domain, answer, current_timestamp_ms());
    }

    /// [`insert`](Self::insert) stamped at `now_ms`.
    pub fn insert_at(&mut self, domain: String, answer: Message, now_ms: u64) {
        let is_overwrite = self.entries.contains_key(&domain);

        if let Some(lru) = self.lru.as_mut() {
            if !is_overwrite && self.entries.len() >= self.max_entries {
                if let Some(evicted) = lru.evict_oldest() {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                }
            }
            lru.touch(&domain);
        }

        let entry = CacheEntry::new_at(answer, self.ttl, now_ms);
        self.entries.insert(domain, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Inspection ==
    /// Expiry timestamp (Unix ms) of the entry for `domain`, expired or not.
    pub fn expires_at(&self, domain: &str) -> Option<u64> {
        self.entries.get(domain).map(|entry| entry.expires_at)
    }

    /// Whether an entry exists for `domain`, without checking freshness.
    pub fn contains_key(&self, domain: &str) -> bool {
        self.entries.contains_key(domain)
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
