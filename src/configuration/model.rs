//! Configuration entity
//!
//! Defines the fetched configuration payload and where it came from.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// == Configuration ==
/// A configuration snapshot as delivered by the requestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// When the snapshot was fetched from its source
    pub fetched_at: DateTime<Utc>,
    /// When the source published the snapshot
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Environment name reported by the source
    #[serde(default)]
    pub environment: Option<String>,
    /// Flag definitions keyed by flag key
    #[serde(default)]
    pub flags: HashMap<String, serde_json::Value>,
}

impl Configuration {
    /// Creates an empty configuration fetched at `fetched_at`.
    pub fn new(fetched_at: DateTime<Utc>) -> Self {
        Self {
            fetched_at,
            published_at: None,
            environment: None,
            flags: HashMap::new(),
        }
    }

    /// Decodes a configuration from its JSON wire form.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// `fetched_at` as Unix milliseconds; pre-epoch timestamps read as 0.
    pub fn fetched_at_ms(&self) -> u64 {
        u64::try_from(self.fetched_at.timestamp_millis()).unwrap_or(0)
    }
}

// == Configuration Source ==
/// Where a broadcast configuration originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigurationSource {
    /// Fetched over the network by the poller
    Network,
    /// Loaded from a local or persisted store
    Cache,
}

impl fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationSource::Network => write!(f, "network"),
            ConfigurationSource::Cache => write!(f, "cache"),
        }
    }
}
