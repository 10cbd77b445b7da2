//! Error types for configuration validation
//!
//! Invalid targets are rejected here, before they ever reach the engine.

use std::fmt;

/// Result type alias for configuration validation
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while resolving a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A target was configured without an address
    EmptyAddress,

    /// Two targets share the same address
    DuplicateAddress(String),

    /// Probe interval must be at least one second
    InvalidInterval,

    /// Probe timeout must be non-zero
    InvalidTimeout,

    /// History capacity must be non-zero
    InvalidHistoryCapacity,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyAddress => write!(f, "target address must not be empty"),
            ConfigError::DuplicateAddress(address) => {
                write!(f, "target address '{}' is configured more than once", address)
            }
            ConfigError::InvalidInterval => write!(f, "probe interval must be at least 1 second"),
            ConfigError::InvalidTimeout => write!(f, "probe timeout must be greater than zero"),
            ConfigError::InvalidHistoryCapacity => {
                write!(f, "history capacity must be greater than zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
