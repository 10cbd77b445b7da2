//! Probing and per-target state tracking
//!
//! - [`ping`]: the [`ping::Prober`] seam and the system `ping` implementation
//! - [`status`]: edge-triggered up/down state machine per target

pub mod ping;
pub mod status;
