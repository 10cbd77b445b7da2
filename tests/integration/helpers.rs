//! Helper functions for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pingwatch::{
    ProbeResult, Target,
    actors::scheduler::SchedulerSettings,
    alerts::{AlertDispatcher, AlertTransport, DownAlert},
    monitor::Monitor,
    monitors::ping::Prober,
};
use tokio::sync::{Mutex, mpsc};

pub fn create_target(address: &str) -> Target {
    Target::new(format!("Test {address}"), address)
}

pub async fn create_monitor(addresses: &[&str], alerts: AlertDispatcher) -> Arc<Monitor> {
    let monitor = Monitor::new(200, alerts);
    monitor
        .set_targets(addresses.iter().map(|a| create_target(a)).collect())
        .await;
    Arc::new(monitor)
}

/// Settings that never tick on their own; rounds are driven with `check_now`
pub fn manual_settings() -> SchedulerSettings {
    SchedulerSettings {
        interval: Duration::from_secs(3600),
        timeout: Duration::from_secs(5),
        start_delay: Duration::from_secs(3600),
    }
}

pub fn fast_settings() -> SchedulerSettings {
    SchedulerSettings {
        interval: Duration::from_millis(100),
        timeout: Duration::from_secs(5),
        start_delay: Duration::from_millis(10),
    }
}

/// Replays a scripted reachability sequence per address.
///
/// Addresses without a script (or with an exhausted one) are up.
#[derive(Default)]
pub struct ScriptedProber {
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    delays: HashMap<String, Duration>,
    pub probes: AtomicUsize,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    pub async fn script(&self, address: &str, sequence: &[bool]) {
        self.scripts
            .lock()
            .await
            .insert(address.to_string(), sequence.iter().copied().collect());
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, target: &Target, _timeout: Duration) -> ProbeResult {
        self.probes.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&target.address) {
            tokio::time::sleep(*delay).await;
        }

        let reachable = self
            .scripts
            .lock()
            .await
            .get_mut(&target.address)
            .and_then(|script| script.pop_front())
            .unwrap_or(true);

        if reachable {
            ProbeResult::up(10.0)
        } else {
            ProbeResult::down()
        }
    }
}

/// Forwards every alert into a channel so tests can count deliveries
pub struct RecordingTransport {
    sender: mpsc::UnboundedSender<DownAlert>,
}

impl RecordingTransport {
    pub fn dispatcher() -> (AlertDispatcher, mpsc::UnboundedReceiver<DownAlert>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let dispatcher = AlertDispatcher::new(Arc::new(RecordingTransport { sender }));
        (dispatcher, receiver)
    }
}

#[async_trait]
impl AlertTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, alert: &DownAlert) -> Result<()> {
        self.sender.send(alert.clone())?;
        Ok(())
    }
}

/// Never completes; used to show the engine does not wait for delivery
pub struct HangingTransport;

#[async_trait]
impl AlertTransport for HangingTransport {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn send(&self, _alert: &DownAlert) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Collect every alert delivered within `window`
pub async fn drain_alerts(
    receiver: &mut mpsc::UnboundedReceiver<DownAlert>,
    window: Duration,
) -> Vec<DownAlert> {
    let mut alerts = vec![];
    while let Ok(Some(alert)) = tokio::time::timeout(window, receiver.recv()).await {
        alerts.push(alert);
    }
    alerts
}

/// Wait until the mock server saw `count` requests (or give up after 2s)
pub async fn wait_for_requests(server: &wiremock::MockServer, count: usize) -> usize {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let received = server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default();
        if received >= count || tokio::time::Instant::now() >= deadline {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
