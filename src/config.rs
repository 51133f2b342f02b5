//! Configuration Module
//!
//! Handles loading client settings from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_ASSIGNMENT_CACHE_TTL;
use crate::clock::duration_ms;
use crate::error::{Error, Result};

/// Default interval between polls (30 seconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
/// Default ceiling for the backed-off interval (5 minutes)
pub const DEFAULT_MAX_POLL_INTERVAL_MS: u64 = 300_000;
/// Default age under which a configuration is considered fresh
pub const DEFAULT_MAX_AGE_MS: u64 = 30_000;
/// Default jitter percentage applied to each wait
pub const DEFAULT_POLL_JITTER_PCT: f64 = 0.1;
/// Default assignment cache size
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 50_000;

// == Cache Config ==
/// Settings for the assignment deduplication cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Idle TTL in milliseconds
    pub ttl_ms: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            ttl_ms: duration_ms(DEFAULT_ASSIGNMENT_CACHE_TTL),
        }
    }
}

// == Poller Config ==
/// Settings for the configuration poller.
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    /// Wait between polls when the last fetch succeeded
    pub base_polling_interval_ms: u64,
    /// Upper bound for the backed-off wait, before jitter
    pub max_polling_interval_ms: u64,
    /// A configuration younger than this is not refetched
    pub max_age_ms: u64,
    /// Jitter as a fraction of the wait, in `[0, 1]`
    pub jitter_pct: f64,
}

impl PollerConfig {
    /// Rejects settings the poll loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.base_polling_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "base polling interval must be non-zero".to_string(),
            ));
        }
        if self.max_polling_interval_ms < self.base_polling_interval_ms {
            return Err(Error::InvalidConfig(format!(
                "max polling interval ({}ms) is below the base interval ({}ms)",
                self.max_polling_interval_ms, self.base_polling_interval_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.jitter_pct) {
            return Err(Error::InvalidConfig(format!(
                "jitter percentage {} is outside [0, 1]",
                self.jitter_pct
            )));
        }
        Ok(())
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            base_polling_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_polling_interval_ms: DEFAULT_MAX_POLL_INTERVAL_MS,
            max_age_ms: DEFAULT_MAX_AGE_MS,
            jitter_pct: DEFAULT_POLL_JITTER_PCT,
        }
    }
}

// == Config ==
/// Client configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub cache: CacheConfig,
    pub poller: PollerConfig,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_ENTRIES` - Assignment cache size (default: 50000)
    /// - `CACHE_TTL_MS` - Assignment cache idle TTL (default: 600000)
    /// - `POLL_INTERVAL_MS` - Base polling interval (default: 30000)
    /// - `MAX_POLL_INTERVAL_MS` - Backoff ceiling (default: 300000)
    /// - `CONFIG_MAX_AGE_MS` - Freshness window (default: 30000)
    /// - `POLL_JITTER_PCT` - Jitter fraction (default: 0.1)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache: CacheConfig {
                max_entries: env_or("CACHE_MAX_ENTRIES", defaults.cache.max_entries),
                ttl_ms: env_or("CACHE_TTL_MS", defaults.cache.ttl_ms),
            },
            poller: PollerConfig {
                base_polling_interval_ms: env_or(
                    "POLL_INTERVAL_MS",
                    defaults.poller.base_polling_interval_ms,
                ),
                max_polling_interval_ms: env_or(
                    "MAX_POLL_INTERVAL_MS",
                    defaults.poller.max_polling_interval_ms,
                ),
                max_age_ms: env_or("CONFIG_MAX_AGE_MS", defaults.poller.max_age_ms),
                jitter_pct: env_or("POLL_JITTER_PCT", defaults.poller.jitter_pct),
            },
        }
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<()> {
        if self.cache.max_entries == 0 {
            return Err(Error::InvalidConfig(
                "cache max entries must be non-zero".to_string(),
            ));
        }
        self.poller.validate()
    }
}

/// Reads and parses `name`, falling back to `default` when unset or unparseable.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
