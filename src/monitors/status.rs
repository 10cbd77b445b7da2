//! Per-target up/down state machine
//!
//! ```text
//! previous  current  → event
//! unknown   up/down  → none (first probe)
//! up        up       → none
//! up        down     → TransitionEvent { new_reachable: false }
//! down      up       → TransitionEvent { new_reachable: true }
//! down      down     → none
//! ```
//!
//! Each target's status lives behind its own mutex so that records for
//! different targets never contend; the outer map is only write-locked when
//! targets are added or removed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

use crate::events::TransitionEvent;
use crate::{ProbeResult, Target};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStatus {
    pub target: Target,

    /// `None` until the first probe completes
    pub current_reachable: Option<bool>,

    /// Value of `current_reachable` as of the prior probe
    pub previous_reachable: Option<bool>,

    pub last_latency_ms: Option<f64>,

    pub last_checked_at: Option<DateTime<Utc>>,
}

impl HostStatus {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            current_reachable: None,
            previous_reachable: None,
            last_latency_ms: None,
            last_checked_at: None,
        }
    }

    /// Fold one probe result into the status and report a transition, if any.
    pub fn apply(&mut self, result: &ProbeResult) -> Option<TransitionEvent> {
        self.last_latency_ms = result.latency_ms;
        self.last_checked_at = Some(result.timestamp);
        self.previous_reachable = self.current_reachable;
        self.current_reachable = Some(result.reachable);

        match self.previous_reachable {
            Some(previous) if previous != result.reachable => Some(TransitionEvent {
                timestamp: result.timestamp,
                target: self.target.clone(),
                new_reachable: result.reachable,
            }),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.current_reachable {
            Some(true) => "UP",
            Some(false) => "DOWN",
            None => "UNKNOWN",
        }
    }
}

/// Current and previous reachability for every registered target
#[derive(Debug, Default)]
pub struct StateTracker {
    hosts: RwLock<HashMap<String, Arc<Mutex<HostStatus>>>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target with unknown status.
    ///
    /// Re-registering an address keeps its status and only updates the name.
    pub async fn insert(&self, target: Target) {
        let existing = self.hosts.read().await.get(&target.address).cloned();
        if let Some(entry) = existing {
            entry.lock().await.target.name = target.name;
            return;
        }

        self.hosts
            .write()
            .await
            .entry(target.address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(HostStatus::new(target))));
    }

    pub async fn remove(&self, address: &str) -> bool {
        self.hosts.write().await.remove(address).is_some()
    }

    /// Record a completed probe for `address`.
    ///
    /// Returns a copy of the updated status together with the transition the
    /// result caused, or `None` when the address is not registered.
    pub async fn record(
        &self,
        address: &str,
        result: &ProbeResult,
    ) -> Option<(HostStatus, Option<TransitionEvent>)> {
        let Some(entry) = self.hosts.read().await.get(address).cloned() else {
            trace!("dropping result for unregistered target {address}");
            return None;
        };

        let mut status = entry.lock().await;
        let transition = status.apply(result);
        Some((status.clone(), transition))
    }

    pub async fn status(&self, address: &str) -> Option<HostStatus> {
        let entry = self.hosts.read().await.get(address).cloned()?;
        let status = entry.lock().await.clone();
        Some(status)
    }

    pub async fn len(&self) -> usize {
        self.hosts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.hosts.read().await.is_empty()
    }
}
