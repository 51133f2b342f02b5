//! Configuration Requestor
//!
//! Interface to whatever transport fetches configuration.

use async_trait::async_trait;

use super::Configuration;
use crate::error::Result;

/// Fetches the latest configuration.
///
/// `Ok(None)` means the source had nothing usable to hand back. Timeouts are
/// the implementation's responsibility; the poller never aborts a fetch.
#[async_trait]
pub trait ConfigurationRequestor: Send + Sync {
    async fn fetch_configuration(&self) -> Result<Option<Configuration>>;
}
