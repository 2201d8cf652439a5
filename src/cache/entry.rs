//! Cache Entry Module
//!
//! Defines a cached upstream answer together with its expiry.

use std::time::{SystemTime, UNIX_EPOCH};

use hickory_proto::op::Message;

// == Cache Entry ==
/// A resolved upstream answer and the moment it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The upstream response, returned as-is on a hit
    pub answer: Message,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped at `now_ms` that expires `ttl_seconds` later.
    pub fn new_at(answer: Message, ttl_seconds: u64, now_ms: u64) -> Self {
        Self {
            answer,
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl_seconds.saturating_mul(1000)),
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is stale at `now_ms`.
    ///
    /// Boundary condition: an entry is expired once `now_ms >= expires_at`, so
    /// it is served strictly before its expiry instant and never at it.
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
///
/// A clock set before the epoch reads as 0 rather than panicking.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
