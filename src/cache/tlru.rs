//! Time-Aware LRU Cache Module
//!
//! Bounded LRU storage combined with an idle TTL. Expiry is enforced lazily:
//! every `get` and `set` sweeps expired entries before touching the store.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use lru::LruCache;
use tracing::debug;

use crate::cache::CacheStats;
use crate::clock::{duration_ms, Clock, SystemClock};
use crate::error::{Error, Result};

// == TLRU Cache ==
/// LRU cache whose entries also expire after `ttl` without a `get` or `set`.
///
/// Not thread-safe on its own; wrap it in a lock when shared between tasks.
#[derive(Debug)]
pub struct TlruCache {
    /// Capacity-bounded value storage
    store: LruCache<String, String>,
    /// Key -> expiry timestamp (ms), oldest expiry at the LRU end
    expiries: LruCache<String, u64>,
    /// Idle time-to-live in milliseconds
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl TlruCache {
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries, each expiring
    /// after `ttl` of inactivity.
    pub fn new(capacity: usize, ttl: Duration) -> Result<Self> {
        Self::with_clock(capacity, ttl, Arc::new(SystemClock))
    }

    /// Same as [`TlruCache::new`] with an explicit time source.
    pub fn with_clock(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::InvalidConfig("cache capacity must be non-zero".to_string()))?;

        Ok(Self {
            store: LruCache::new(capacity),
            expiries: LruCache::unbounded(),
            ttl_ms: duration_ms(ttl),
            clock,
            stats: CacheStats::new(),
        })
    }

    // == Set ==
    /// Inserts or overwrites `key`, resetting its expiry to now + ttl.
    ///
    /// When the store is full, the least recently used entry is evicted.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.evict_expired();

        let key = key.into();
        if let Some((evicted, _)) = self.store.push(key.clone(), value.into()) {
            // push hands back either the overwritten pair or a capacity victim
            if evicted != key {
                self.expiries.pop(&evicted);
                self.stats.record_eviction();
            }
        }
        self.reset_expiry(key);
    }

    // == Get ==
    /// Returns the value for `key`. A hit counts as an access and defers expiry.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.evict_expired();

        match self.store.get(key).cloned() {
            Some(value) => {
                self.stats.record_hit();
                self.reset_expiry(key.to_string());
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.expiries.pop(key);
        self.store.pop(key).is_some()
    }

    // == Has ==
    /// Checks presence without refreshing recency or expiry.
    ///
    /// Entries past their expiry read as absent even before the next sweep.
    pub fn has(&self, key: &str) -> bool {
        self.store.contains(key) && !self.is_expired(key, self.clock.now_ms())
    }

    // == For Each ==
    /// Visits live entries from most to least recently used without touching
    /// recency or expiry.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&str, &str),
    {
        let now = self.clock.now_ms();
        for (key, value) in self.store.iter() {
            if !self.is_expired(key, now) {
                f(key, value);
            }
        }
    }

    // == Evict Expired ==
    /// Removes every entry whose expiry time has passed.
    ///
    /// The registry is ordered oldest expiry first, so the sweep stops at the
    /// first live entry. Returns the number of entries removed.
    pub fn evict_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let mut removed = 0;

        loop {
            let expired = matches!(self.expiries.peek_lru(), Some((_, &at)) if at <= now);
            if !expired {
                break;
            }
            if let Some((key, _)) = self.expiries.pop_lru() {
                self.store.pop(&key);
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("TLRU sweep: removed {} expired entries", removed);
            self.stats.record_expirations(removed);
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.store.cap().get()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    // == Internals ==
    /// Moves `key` to the newest registry position with a fresh expiry.
    fn reset_expiry(&mut self, key: String) {
        let expires_at = self.clock.now_ms().saturating_add(self.ttl_ms);
        self.expiries.push(key, expires_at);
    }

    fn is_expired(&self, key: &str, now: u64) -> bool {
        matches!(self.expiries.peek(key), Some(&at) if at <= now)
    }

    /// Keys and expiries, oldest expiry first.
    #[cfg(test)]
    pub(crate) fn registry(&self) -> Vec<(String, u64)> {
        self.expiries
            .iter()
            .rev()
            .map(|(k, &at)| (k.clone(), at))
            .collect()
    }
}
