//! Shared engine state
//!
//! The [`Monitor`] ties the per-target pieces together:
//!
//! ```text
//! probe result → StateTracker → HistoryStore
//!                     │
//!                     └─ transition? → EventLog → AlertDispatcher (down only)
//! ```
//!
//! Results for one target are applied under that target's lane lock, so the
//! status, history and event log of a target always change in the same order.
//! Different targets use different lanes and proceed in parallel.
//!
//! Every registration of an address gets its own generation. A probe carries
//! the [`Registration`] it was started for, and its result is discarded when
//! the address was removed (or removed and added again) in the meantime.
//!
//! Once [`Monitor::stop`] returns, no probe result is applied anymore.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, instrument, trace};

use crate::actors::messages::MonitorEvent;
use crate::alerts::AlertDispatcher;
use crate::config::ResolvedConfig;
use crate::events::{EventLog, TransitionEvent};
use crate::history::{HistorySample, HistoryStore};
use crate::monitors::status::{HostStatus, StateTracker};
use crate::{ProbeResult, Target};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug)]
struct Lane {
    generation: u64,

    /// Serializes result application for one target
    lock: Arc<Mutex<()>>,
}

#[derive(Debug, Default)]
struct Registry {
    /// Targets in configured order
    targets: Vec<Target>,

    lanes: HashMap<String, Lane>,
    next_generation: u64,
}

/// A target as registered at the time a probe was started
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub target: Target,
    generation: u64,
}

#[derive(Debug)]
pub struct Monitor {
    registry: RwLock<Registry>,
    tracker: StateTracker,
    history: HistoryStore,
    events: EventLog,
    alerts: AlertDispatcher,
    event_tx: broadcast::Sender<MonitorEvent>,

    /// Write-locked by `stop`, read-locked while a result is applied
    stopped: RwLock<bool>,
}

impl Monitor {
    pub fn new(history_capacity: usize, alerts: AlertDispatcher) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            registry: RwLock::new(Registry::default()),
            tracker: StateTracker::new(),
            history: HistoryStore::new(history_capacity),
            events: EventLog::new(),
            alerts,
            event_tx,
            stopped: RwLock::new(false),
        }
    }

    pub async fn from_config(config: &ResolvedConfig) -> Arc<Self> {
        let monitor = Self::new(
            config.history_capacity,
            AlertDispatcher::from_config(config.alert.as_ref()),
        );
        monitor.set_targets(config.targets.clone()).await;
        Arc::new(monitor)
    }

    /// Replace the monitored targets.
    ///
    /// New addresses start with unknown status and empty history, removed
    /// addresses lose their state, and kept addresses keep it (a changed name
    /// is applied).
    #[instrument(skip_all, fields(count = targets.len()))]
    pub async fn set_targets(&self, targets: Vec<Target>) {
        let mut registry = self.registry.write().await;

        let removed: Vec<String> = registry
            .lanes
            .keys()
            .filter(|address| !targets.iter().any(|t| &t.address == *address))
            .cloned()
            .collect();

        for address in removed {
            debug!("removing target {address}");
            registry.lanes.remove(&address);
            self.tracker.remove(&address).await;
            self.history.remove(&address).await;
        }

        for target in &targets {
            self.register(&mut registry, target.clone()).await;
        }

        registry.targets = targets;
    }

    /// Add a target, or rename it if the address is already monitored.
    pub async fn add_target(&self, target: Target) {
        let mut registry = self.registry.write().await;

        match registry
            .targets
            .iter()
            .position(|t| t.address == target.address)
        {
            Some(index) => registry.targets[index].name = target.name.clone(),
            None => registry.targets.push(target.clone()),
        }

        self.register(&mut registry, target).await;
    }

    pub async fn remove_target(&self, address: &str) -> bool {
        let mut registry = self.registry.write().await;

        let before = registry.targets.len();
        registry.targets.retain(|t| t.address != address);
        registry.lanes.remove(address);
        self.tracker.remove(address).await;
        self.history.remove(address).await;

        registry.targets.len() != before
    }

    async fn register(&self, registry: &mut Registry, target: Target) {
        if !registry.lanes.contains_key(&target.address) {
            debug!("adding target {target}");
            let generation = registry.next_generation;
            registry.next_generation += 1;
            registry.lanes.insert(
                target.address.clone(),
                Lane {
                    generation,
                    lock: Arc::new(Mutex::new(())),
                },
            );
        }
        self.history.insert(&target.address).await;
        self.tracker.insert(target).await;
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.registry.read().await.targets.clone()
    }

    /// Current targets in configured order, each with its registration.
    pub async fn registrations(&self) -> Vec<Registration> {
        let registry = self.registry.read().await;
        registry
            .targets
            .iter()
            .filter_map(|target| {
                registry.lanes.get(&target.address).map(|lane| Registration {
                    target: target.clone(),
                    generation: lane.generation,
                })
            })
            .collect()
    }

    /// Apply a completed probe to the target's current registration.
    ///
    /// Returns the transition it caused, if any. Results for unknown targets
    /// and results arriving after [`Monitor::stop`] are discarded.
    pub async fn apply(&self, target: &Target, result: ProbeResult) -> Option<TransitionEvent> {
        self.apply_to(&target.address, None, result).await
    }

    /// Apply a completed probe for the registration it was started for.
    ///
    /// Discarded when the address is no longer registered under the same
    /// generation.
    pub async fn apply_registered(
        &self,
        registration: &Registration,
        result: ProbeResult,
    ) -> Option<TransitionEvent> {
        self.apply_to(
            &registration.target.address,
            Some(registration.generation),
            result,
        )
        .await
    }

    async fn apply_to(
        &self,
        address: &str,
        generation: Option<u64>,
        result: ProbeResult,
    ) -> Option<TransitionEvent> {
        // held until the result is applied, so removal waits for it
        let registry = self.registry.read().await;

        let lane = match registry.lanes.get(address) {
            Some(lane) if generation.is_none_or(|g| g == lane.generation) => lane,
            Some(_) => {
                trace!("discarding result for a previous registration of {address}");
                return None;
            }
            None => {
                trace!("discarding result for removed target {address}");
                return None;
            }
        };
        let _lane = lane.lock.lock().await;

        let stopped = self.stopped.read().await;
        if *stopped {
            trace!("monitor stopped, discarding result for {address}");
            return None;
        }

        let (status, transition) = self.tracker.record(address, &result).await?;
        self.history
            .append(address, HistorySample::from(&result))
            .await;

        let _ = self.event_tx.send(MonitorEvent::ProbeCompleted {
            target: status.target,
            result,
        });

        if let Some(event) = &transition {
            info!("{event}");
            self.events.append(event.clone()).await;
            self.alerts.notify(event);
            let _ = self.event_tx.send(MonitorEvent::Transition(event.clone()));
        }

        transition
    }

    /// Close the monitor for writes. Waits for results currently being
    /// applied; every later result is discarded.
    pub async fn stop(&self) {
        let mut stopped = self.stopped.write().await;
        *stopped = true;
        debug!("monitor stopped");
    }

    pub async fn is_stopped(&self) -> bool {
        *self.stopped.read().await
    }

    /// Statuses of all targets, in configured order.
    pub async fn statuses(&self) -> Vec<HostStatus> {
        let targets = self.targets().await;

        let mut statuses = Vec::with_capacity(targets.len());
        for target in targets {
            if let Some(status) = self.tracker.status(&target.address).await {
                statuses.push(status);
            }
        }
        statuses
    }

    pub async fn status(&self, address: &str) -> Option<HostStatus> {
        self.tracker.status(address).await
    }

    pub async fn history(&self, address: &str) -> Vec<HistorySample> {
        self.history.snapshot(address).await
    }

    pub async fn events(&self) -> Vec<TransitionEvent> {
        self.events.entries().await
    }

    pub async fn clear_events(&self) {
        self.events.clear().await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.event_tx.subscribe()
    }

    pub fn alerts(&self) -> &AlertDispatcher {
        &self.alerts
    }
}
