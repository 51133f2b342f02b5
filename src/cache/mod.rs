//! Cache Module
//!
//! Time-aware LRU caching and the assignment deduplication cache built on it.

mod assignment;
mod stats;
mod tlru;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use assignment::{
    AssignmentCache, AssignmentCacheKey, ExpiringAssignmentCache, DEFAULT_ASSIGNMENT_CACHE_TTL,
};
pub use stats::CacheStats;
pub use tlru::TlruCache;
