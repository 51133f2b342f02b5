//! Configuration Feed
//!
//! Synchronous publish/subscribe channel for newly available configuration.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Configuration, ConfigurationSource};

/// Callback invoked for every broadcast configuration.
pub type ConfigurationListener = Arc<dyn Fn(&Configuration, ConfigurationSource) + Send + Sync>;

// == Configuration Feed ==
/// Delivers each broadcast to every listener, in registration order, on the
/// broadcasting task.
#[derive(Default)]
pub struct ConfigurationFeed {
    listeners: RwLock<Vec<ConfigurationListener>>,
}

impl ConfigurationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for all future broadcasts.
    pub fn add_listener<F>(&self, listener: F)
    where
        F: Fn(&Configuration, ConfigurationSource) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Delivers `configuration` to every registered listener.
    pub fn broadcast(&self, configuration: &Configuration, source: ConfigurationSource) {
        // Snapshot so listeners may register further listeners without deadlocking
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener(configuration, source);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl fmt::Debug for ConfigurationFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationFeed")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
