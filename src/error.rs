//! Error types for the configuration client
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Error Enum ==
/// Unified error type for the configuration client.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be fetched (transport failure, timeout, ...)
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Configuration endpoint answered with a non-success status
    #[error("Unexpected HTTP status: {status}")]
    Http { status: u16 },

    /// Configuration payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid construction parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the configuration client.
pub type Result<T> = std::result::Result<T, Error>;
