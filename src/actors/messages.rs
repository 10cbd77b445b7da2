//! Message types for actor communication
//!
//! 1. **Commands**: control messages sent to the scheduler via mpsc
//! 2. **Events**: broadcast notifications for readers (dashboards, loggers)

use tokio::sync::oneshot;

use crate::events::TransitionEvent;
use crate::{ProbeResult, Target};

/// Event published by the engine for external readers
///
/// Slow subscribers may lag and miss events; the authoritative state is
/// always available through the `Monitor` snapshot methods.
#[derive(Debug, Clone)]
pub enum MonitorEvent {
    /// A probe result has been applied to the target's status and history
    ProbeCompleted { target: Target, result: ProbeResult },

    /// The target's reachability changed
    Transition(TransitionEvent),
}

/// Commands that can be sent to the SchedulerActor
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run one probing round right away, outside the regular cadence
    ///
    /// Responds with the number of targets probed once all of them completed.
    CheckNow { respond_to: oneshot::Sender<usize> },

    /// Change the tick period
    ///
    /// The next tick fires one new period after the command is handled.
    UpdateInterval { interval_secs: u64 },

    /// Stop ticking, abort in-flight probes and close the monitor
    ///
    /// Responds once no further probe result can be applied.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Lifecycle of the scheduler: `Idle → Running → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}
