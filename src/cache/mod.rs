//! Cache Module
//!
//! In-memory answer cache with fixed-TTL expiration and optional LRU bound.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub(crate) use entry::current_timestamp_ms;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, SharedCache};

// == Public Constants ==
/// TTL in seconds applied to every cached answer unless configured otherwise
pub const DEFAULT_CACHE_TTL: u64 = 300;
