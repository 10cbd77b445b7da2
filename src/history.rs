//! Bounded per-target latency history
//!
//! Each target owns a ring buffer of at most `capacity` samples, ordered
//! oldest to newest. Once the buffer is full, every append evicts the oldest
//! sample.
//!
//! ## Concurrency
//!
//! Buffers sit behind their own mutex, so writers for different targets never
//! block each other. Readers get a copy via [`HistoryStore::snapshot`] and
//! never hold a reference into a live buffer.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::trace;

use crate::ProbeResult;

/// Default number of samples kept per target
pub const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: DateTime<Utc>,

    /// `None` marks a failed probe
    pub latency_ms: Option<f64>,
}

impl From<&ProbeResult> for HistorySample {
    fn from(result: &ProbeResult) -> Self {
        Self {
            timestamp: result.timestamp,
            latency_ms: if result.reachable { result.latency_ms } else { None },
        }
    }
}

type Buffer = Arc<Mutex<VecDeque<HistorySample>>>;

#[derive(Debug)]
pub struct HistoryStore {
    capacity: usize,
    buffers: RwLock<HashMap<String, Buffer>>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryStore {
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty buffer for `address` unless one already exists.
    pub async fn insert(&self, address: &str) {
        if self.buffers.read().await.contains_key(address) {
            return;
        }

        self.buffers
            .write()
            .await
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.capacity))));
    }

    pub async fn remove(&self, address: &str) -> bool {
        self.buffers.write().await.remove(address).is_some()
    }

    /// Append a sample, evicting the oldest one when the buffer is full.
    ///
    /// Samples for unknown addresses are dropped.
    pub async fn append(&self, address: &str, sample: HistorySample) {
        let Some(buffer) = self.buffers.read().await.get(address).cloned() else {
            trace!("dropping sample for unregistered target {address}");
            return;
        };

        let mut buffer = buffer.lock().await;
        while buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(sample);
    }

    /// Copy of the samples for `address`, oldest first.
    pub async fn snapshot(&self, address: &str) -> Vec<HistorySample> {
        let Some(buffer) = self.buffers.read().await.get(address).cloned() else {
            return vec![];
        };

        let buffer = buffer.lock().await;
        buffer.iter().cloned().collect()
    }

    pub async fn len(&self, address: &str) -> usize {
        let Some(buffer) = self.buffers.read().await.get(address).cloned() else {
            return 0;
        };
        let len = buffer.lock().await.len();
        len
    }

    pub async fn contains(&self, address: &str) -> bool {
        self.buffers.read().await.contains_key(address)
    }
}
