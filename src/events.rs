//! Transition events and the append-only event log

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::Target;

/// A change in a target's reachability between two consecutive probes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub timestamp: DateTime<Utc>,
    pub target: Target,
    pub new_reachable: bool,
}

impl TransitionEvent {
    pub fn is_down(&self) -> bool {
        !self.new_reachable
    }

    pub fn status_text(&self) -> &'static str {
        if self.new_reachable { "UP" } else { "DOWN" }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            self.target,
            self.status_text()
        )
    }
}

/// Every transition in arrival order. Never evicts; only [`EventLog::clear`]
/// empties it.
#[derive(Debug, Default)]
pub struct EventLog {
    entries: RwLock<Vec<TransitionEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, event: TransitionEvent) {
        self.entries.write().await.push(event);
    }

    pub async fn entries(&self) -> Vec<TransitionEvent> {
        self.entries.read().await.clone()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
