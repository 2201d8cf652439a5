//! LRU Tracker Module
//!
//! Recency ordering for the optional capacity bound of the DNS cache.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks which domains were used least recently.
///
/// Every touch stamps the domain with a monotonically increasing tick.
/// `order` maps tick -> domain so the smallest tick is the eviction
/// candidate; `ticks` maps domain -> its current tick so stale positions
/// can be dropped on re-touch.
#[derive(Debug, Default)]
pub struct LruTracker {
    order: BTreeMap<u64, String>,
    ticks: HashMap<String, u64>,
    next_tick: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a domain as most recently used.
    pub fn touch(&mut self, domain: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(old) = self.ticks.insert(domain.to_string(), tick) {
            self.order.remove(&old);
        }
        self.order.insert(tick, domain.to_string());
    }

    // == Remove ==
    /// Stops tracking a domain. Unknown domains are ignored.
    pub fn remove(&mut self, domain: &str) {
        if let Some(tick) = self.ticks.remove(domain) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used domain.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, domain) = self.order.pop_first()?;
        self.ticks.remove(&domain);
        Some(domain)
    }

    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.first_key_value().map(|(_, domain)| domain)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    #[allow(dead_code)]
    pub fn contains(&self, domain: &str) -> bool {
        self.ticks.contains_key(domain)
    }
}
