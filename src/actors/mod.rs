//! Actor-based scheduling
//!
//! The scheduler runs as an independent async task and is controlled through
//! a [`scheduler::SchedulerHandle`] over an mpsc command channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │  SchedulerActor  │  tick every interval
//!                 └────────┬─────────┘
//!                          │ spawns one task per target
//!          ┌───────────────┼───────────────┐
//!          │               │               │
//!   ┌──────▼──────┐ ┌──────▼──────┐ ┌──────▼──────┐
//!   │ probe (A)   │ │ probe (B)   │ │ probe (N)   │
//!   └──────┬──────┘ └──────┬──────┘ └──────┬──────┘
//!          └───────────────┼───────────────┘
//!                          │ Monitor::apply (per-target lane)
//!                 ┌────────▼─────────┐
//!                 │     Monitor      │──► broadcast<MonitorEvent>
//!                 └──────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: mpsc channel into the scheduler (CheckNow, UpdateInterval, Shutdown)
//! 2. **Events**: the monitor publishes [`messages::MonitorEvent`] on a broadcast channel
//! 3. **Request/Response**: oneshot channels for CheckNow and Shutdown acknowledgements

pub mod messages;
pub mod scheduler;
