//! Configuration Module
//!
//! The fetched configuration entity, the feed that distributes it, and the
//! requestor interface the poller fetches it through.

mod feed;
mod model;
mod requestor;

pub use feed::{ConfigurationFeed, ConfigurationListener};
pub use model::{Configuration, ConfigurationSource};
pub use requestor::ConfigurationRequestor;
