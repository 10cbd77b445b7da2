//! SchedulerActor - Drives periodic probing of all targets
//!
//! ## Key Properties
//!
//! 1. **Absolute cadence** - Ticks fire every `interval` from the first tick,
//!    no matter how long the previous round's probes take
//! 2. **Independent probes** - Every target is probed in its own task, a slow
//!    target never delays results for the others
//! 3. **Clean shutdown** - In-flight probes are aborted and the monitor is
//!    closed, so nothing is applied once shutdown has been acknowledged
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → spawn probe per target → Prober → Monitor::apply → [StateTracker, HistoryStore, EventLog, AlertDispatcher]
//!     ↑
//!     └─── Commands (CheckNow, UpdateInterval, Shutdown)
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, instrument, trace, warn};

use crate::config::ResolvedConfig;
use crate::monitor::{Monitor, Registration};
use crate::monitors::ping::Prober;
use crate::{ProbeResult, Target};

use super::messages::{SchedulerCommand, SchedulerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Period between two rounds
    pub interval: Duration,

    /// Time budget for a single probe
    pub timeout: Duration,

    /// Delay between start and the first round
    pub start_delay: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from(&ResolvedConfig::default())
    }
}

impl From<&ResolvedConfig> for SchedulerSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            interval: config.interval,
            timeout: config.timeout,
            start_delay: config.start_delay,
        }
    }
}

/// Actor that probes every registered target once per tick
pub struct SchedulerActor {
    monitor: Arc<Monitor>,
    prober: Arc<dyn Prober>,
    settings: SchedulerSettings,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<SchedulerCommand>,

    /// Lifecycle state, observed by handles
    state_tx: watch::Sender<SchedulerState>,

    /// Probe tasks that have not finished yet
    in_flight: JoinSet<()>,
}

impl SchedulerActor {
    pub fn new(
        monitor: Arc<Monitor>,
        prober: Arc<dyn Prober>,
        settings: SchedulerSettings,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        state_tx: watch::Sender<SchedulerState>,
    ) -> Self {
        Self {
            monitor,
            prober,
            settings,
            command_rx,
            state_tx,
            in_flight: JoinSet::new(),
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command is received or every handle is dropped.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        debug!("starting scheduler actor");
        self.state_tx.send_replace(SchedulerState::Running);

        let mut ticker = new_ticker(self.settings.start_delay, self.settings.interval);
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                // Timer tick - start a probing round
                _ = ticker.tick() => {
                    self.start_round().await;
                }

                // Reap finished probe tasks
                Some(joined) = self.in_flight.join_next(), if !self.in_flight.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!("probe task panicked: {e}");
                        }
                    }
                }

                // Handle commands
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::CheckNow { respond_to }) => {
                            debug!("received CheckNow command");
                            self.check_now(respond_to).await;
                        }

                        Some(SchedulerCommand::UpdateInterval { interval_secs }) => {
                            let interval = Duration::from_secs(interval_secs.max(1));
                            debug!("updating interval to {interval:?}");
                            self.settings.interval = interval;
                            ticker = new_ticker(interval, interval);
                        }

                        Some(SchedulerCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            shutdown_ack = Some(respond_to);
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.monitor.stop().await;
        self.in_flight.shutdown().await;
        self.state_tx.send_replace(SchedulerState::Stopped);

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }

        debug!("scheduler actor stopped");
    }

    /// Spawn one probe task per target.
    async fn start_round(&mut self) {
        let registrations = self.monitor.registrations().await;
        trace!("starting round for {} targets", registrations.len());

        for registration in registrations {
            self.in_flight.spawn(probe_target(
                self.monitor.clone(),
                self.prober.clone(),
                registration,
                self.settings.timeout,
            ));
        }
    }

    /// Run an extra round and answer once all of its probes are applied.
    async fn check_now(&mut self, respond_to: oneshot::Sender<usize>) {
        let registrations = self.monitor.registrations().await;
        let monitor = self.monitor.clone();
        let prober = self.prober.clone();
        let timeout = self.settings.timeout;

        self.in_flight.spawn(async move {
            let count = registrations.len();
            join_all(registrations.into_iter().map(|registration| {
                probe_target(monitor.clone(), prober.clone(), registration, timeout)
            }))
            .await;
            let _ = respond_to.send(count);
        });
    }
}

fn new_ticker(start_delay: Duration, period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + start_delay, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

/// Probe one target and apply the result.
///
/// The timeout is enforced here as well, so a misbehaving prober still
/// resolves to "down" within its budget.
#[instrument(skip_all, fields(host = %registration.target.address))]
async fn probe_target(
    monitor: Arc<Monitor>,
    prober: Arc<dyn Prober>,
    registration: Registration,
    timeout: Duration,
) {
    let result = tokio::time::timeout(timeout, prober.probe(&registration.target, timeout))
        .await
        .unwrap_or_else(|_| ProbeResult::down());

    trace!(
        "probe finished: reachable={} latency={:?}",
        result.reachable, result.latency_ms
    );

    monitor.apply_registered(&registration, result).await;
}

/// Handle for controlling a SchedulerActor
#[derive(Clone)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,
    state_rx: watch::Receiver<SchedulerState>,
    monitor: Arc<Monitor>,
}

impl SchedulerHandle {
    /// Spawn a new scheduler actor over `monitor`
    pub fn spawn(
        monitor: Arc<Monitor>,
        prober: Arc<dyn Prober>,
        settings: SchedulerSettings,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);

        let actor = SchedulerActor::new(monitor.clone(), prober, settings, cmd_rx, state_tx);

        tokio::spawn(actor.run());

        Self {
            sender: cmd_tx,
            state_rx,
            monitor,
        }
    }

    /// Probe all targets immediately and wait until every result is applied
    pub async fn check_now(&self) -> Result<usize> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::CheckNow { respond_to: tx })
            .await
            .context("scheduler is not running")?;

        rx.await.context("scheduler stopped before the round completed")
    }

    /// Update the tick period
    pub async fn update_interval(&self, interval_secs: u64) -> Result<()> {
        self.sender
            .send(SchedulerCommand::UpdateInterval { interval_secs })
            .await
            .context("scheduler is not running")?;
        Ok(())
    }

    /// Stop the scheduler
    ///
    /// Returns once no probe result can reach the monitor anymore.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SchedulerCommand::Shutdown { respond_to: tx })
            .await
            .is_err()
        {
            trace!("scheduler already stopped");
            return;
        }
        let _ = rx.await;
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_rx.borrow()
    }

    pub fn monitor(&self) -> &Arc<Monitor> {
        &self.monitor
    }

    /// Replace the monitored targets; takes effect with the next round
    pub async fn set_targets(&self, targets: Vec<Target>) {
        self.monitor.set_targets(targets).await;
    }

    pub async fn add_target(&self, target: Target) {
        self.monitor.add_target(target).await;
    }

    pub async fn remove_target(&self, address: &str) -> bool {
        self.monitor.remove_target(address).await
    }
}

// ============================================================================
// Tests
// ============================================================================
