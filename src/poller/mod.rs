//! Poller Module
//!
//! Self-scheduling configuration poll loop with freshness checks and
//! jittered exponential backoff.
//!
//! # Components
//! - Backoff: pure wait computation (capped exponential backoff + jitter)
//! - ConfigurationPoller: the start/stop state machine and the loop task

pub mod backoff;
mod configuration_poller;

pub use configuration_poller::{ConfigurationPoller, PollOutcome};
