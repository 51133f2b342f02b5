//! Remote Config - configuration polling and time-aware caching
//!
//! Keeps remotely fetched configuration fresh with a self-scheduling poller,
//! and provides a TTL-bounded LRU cache for deduplicating assignment events.

pub mod cache;
pub mod clock;
pub mod config;
pub mod configuration;
pub mod error;
pub mod poller;

pub use cache::{AssignmentCache, AssignmentCacheKey, ExpiringAssignmentCache, TlruCache};
pub use config::{Config, PollerConfig};
pub use configuration::{
    Configuration, ConfigurationFeed, ConfigurationRequestor, ConfigurationSource,
};
pub use error::{Error, Result};
pub use poller::{ConfigurationPoller, PollOutcome};
