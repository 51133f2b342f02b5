//! Assignment Cache Module
//!
//! Deduplicates assignment logging by remembering which
//! subject/flag/bandit/action combinations were already seen.

use std::time::Duration;

use crate::cache::TlruCache;
use crate::config::CacheConfig;
use crate::error::Result;

/// Default time an assignment stays "already logged" without being seen again (10 minutes).
pub const DEFAULT_ASSIGNMENT_CACHE_TTL: Duration = Duration::from_millis(600_000);

/// Stored under every key; only presence matters.
const PRESENT: &str = "1";

// == Assignment Cache Key ==
/// Composite key identifying one assignment event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssignmentCacheKey {
    pub subject_key: String,
    pub flag_key: String,
    pub bandit_key: String,
    pub action_key: String,
}

impl AssignmentCacheKey {
    pub fn new(
        subject_key: impl Into<String>,
        flag_key: impl Into<String>,
        bandit_key: impl Into<String>,
        action_key: impl Into<String>,
    ) -> Self {
        Self {
            subject_key: subject_key.into(),
            flag_key: flag_key.into(),
            bandit_key: bandit_key.into(),
            action_key: action_key.into(),
        }
    }

    /// Encodes the key as `<len>:<field>` for each field in order.
    ///
    /// Byte-length prefixes make the encoding injective regardless of what
    /// characters the fields contain.
    pub fn to_cache_key(&self) -> String {
        let fields = [
            &self.subject_key,
            &self.flag_key,
            &self.bandit_key,
            &self.action_key,
        ];
        let mut out = String::with_capacity(fields.iter().map(|f| f.len() + 4).sum());
        for field in fields {
            out.push_str(&field.len().to_string());
            out.push(':');
            out.push_str(field);
        }
        out
    }
}

// == Assignment Cache Trait ==
/// Presence cache consulted before logging an assignment.
pub trait AssignmentCache {
    /// Records that `key` has been logged.
    fn set(&mut self, key: &AssignmentCacheKey);

    /// Returns whether `key` was logged recently.
    fn has(&mut self, key: &AssignmentCacheKey) -> bool;
}

// == Expiring Assignment Cache ==
/// [`AssignmentCache`] backed by a [`TlruCache`].
///
/// `has` reads through `TlruCache::get`, so a hit also pushes the entry's
/// expiry out by another TTL.
#[derive(Debug)]
pub struct ExpiringAssignmentCache {
    cache: TlruCache,
}

impl ExpiringAssignmentCache {
    /// Creates an assignment cache of `max_size` entries. `ttl` defaults to
    /// [`DEFAULT_ASSIGNMENT_CACHE_TTL`].
    pub fn new(max_size: usize, ttl: Option<Duration>) -> Result<Self> {
        let cache = TlruCache::new(max_size, ttl.unwrap_or(DEFAULT_ASSIGNMENT_CACHE_TTL))?;
        Ok(Self::from_cache(cache))
    }

    /// Builds the cache described by `config`.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::new(config.max_entries, Some(config.ttl()))
    }

    /// Wraps an already constructed cache.
    pub fn from_cache(cache: TlruCache) -> Self {
        Self { cache }
    }

    pub fn inner(&self) -> &TlruCache {
        &self.cache
    }
}

impl AssignmentCache for ExpiringAssignmentCache {
    fn set(&mut self, key: &AssignmentCacheKey) {
        self.cache.set(key.to_cache_key(), PRESENT);
    }

    fn has(&mut self, key: &AssignmentCacheKey) -> bool {
        self.cache.get(&key.to_cache_key()).is_some()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn key(subject: &str, flag: &str) -> AssignmentCacheKey {
        AssignmentCacheKey::new(subject, flag, "bandit", "action")
    }

    fn cache_with_clock(ttl: Option<Duration>) -> (ExpiringAssignmentCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let ttl = ttl.unwrap_or(DEFAULT_ASSIGNMENT_CACHE_TTL);
        let cache = TlruCache::with_clock(100, ttl, clock.clone()).unwrap();
        (ExpiringAssignmentCache::from_cache(cache), clock)
    }

    #[test]
    fn test_cache_key_encoding() {
        let k = AssignmentCacheKey::new("user-1", "flag", "", "act");
        assert_eq!(k.to_cache_key(), "6:user-14:flag0:3:act");
    }

    #[test]
    fn test_cache_key_no_delimiter_collision() {
        let a = AssignmentCacheKey::new("a:b", "c", "", "");
        let b = AssignmentCacheKey::new("a", "b:c", "", "");
        assert_ne!(a.to_cache_key(), b.to_cache_key());
    }

    #[test]
    fn test_set_then_has() {
        let (mut cache, _) = cache_with_clock(None);

        assert!(!cache.has(&key("alice", "f1")));
        cache.set(&key("alice", "f1"));
        assert!(cache.has(&key("alice", "f1")));
        assert!(!cache.has(&key("alice", "f2")));
        assert!(!cache.has(&key("bob", "f1")));
    }

    #[test]
    fn test_default_ttl() {
        let cache = ExpiringAssignmentCache::new(10, None).unwrap();
        assert_eq!(cache.inner().ttl(), Duration::from_millis(600_000));
    }

    #[test]
    fn test_from_config() {
        let config = CacheConfig {
            max_entries: 3,
            ttl_ms: 1_500,
        };
        let cache = ExpiringAssignmentCache::from_config(&config).unwrap();
        assert_eq!(cache.inner().capacity(), 3);
        assert_eq!(cache.inner().ttl(), Duration::from_millis(1_500));

        let cache = ExpiringAssignmentCache::from_config(&CacheConfig::default()).unwrap();
        assert_eq!(cache.inner().ttl(), DEFAULT_ASSIGNMENT_CACHE_TTL);
    }

    #[test]
    fn test_from_config_rejects_zero_entries() {
        let config = CacheConfig {
            max_entries: 0,
            ..CacheConfig::default()
        };
        assert!(ExpiringAssignmentCache::from_config(&config).is_err());
    }

    #[test]
    fn test_absent_after_default_ttl() {
        let (mut cache, clock) = cache_with_clock(None);

        cache.set(&key("alice", "f1"));
        clock.advance(DEFAULT_ASSIGNMENT_CACHE_TTL);

        assert!(!cache.has(&key("alice", "f1")));
    }

    #[test]
    fn test_has_extends_liveness() {
        let (mut cache, clock) = cache_with_clock(Some(Duration::from_millis(100)));

        cache.set(&key("alice", "f1"));
        clock.advance(Duration::from_millis(60));
        assert!(cache.has(&key("alice", "f1")));
        clock.advance(Duration::from_millis(60));

        // 120ms after set but only 60ms after the last read
        assert!(cache.has(&key("alice", "f1")));
    }
}
