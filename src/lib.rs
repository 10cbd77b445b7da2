pub mod actors;
pub mod alerts;
pub mod config;
pub mod discord;
pub mod error;
pub mod events;
pub mod history;
pub mod monitor;
pub mod monitors;
pub mod util;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named network endpoint. The address is the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub address: String,
}

impl Target {
    pub fn new(name: impl ToString, address: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub reachable: bool,
    pub latency_ms: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl ProbeResult {
    pub fn up(latency_ms: f64) -> Self {
        Self {
            reachable: true,
            latency_ms: Some(latency_ms),
            timestamp: Utc::now(),
        }
    }

    /// Every failure mode (timeout, spawn error, unreachable host) ends up here.
    pub fn down() -> Self {
        Self {
            reachable: false,
            latency_ms: None,
            timestamp: Utc::now(),
        }
    }
}
