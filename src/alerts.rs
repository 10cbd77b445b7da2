//! Best-effort down alerts
//!
//! [`AlertDispatcher::notify`] hands every up→down transition to a detached
//! task and returns immediately. Delivery failures end at the task boundary:
//! they are logged, never retried and never reported back to the engine.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, instrument, trace, warn};

use crate::Target;
use crate::config::{Alert, Telegram, Webhook};
use crate::discord::DiscordTransport;
use crate::events::TransitionEvent;

/// Upper bound for a single delivery attempt
pub const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a transport needs to tell someone a host went down
#[derive(Debug, Clone)]
pub struct DownAlert {
    pub target: Target,
    pub timestamp: DateTime<Utc>,
}

impl DownAlert {
    pub fn message(&self) -> String {
        format!("❗ Host down:\n{}", self.target)
    }
}

impl From<&TransitionEvent> for DownAlert {
    fn from(event: &TransitionEvent) -> Self {
        Self {
            target: event.target.clone(),
            timestamp: event.timestamp,
        }
    }
}

/// Outbound channel for alerts (messaging API, webhook, ...)
#[async_trait]
pub trait AlertTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, alert: &DownAlert) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct TelegramTransport {
    client: Client,
    telegram: Telegram,
}

impl TelegramTransport {
    pub fn new(client: Client, telegram: Telegram) -> Self {
        Self { client, telegram }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.telegram.api_base.trim_end_matches('/'),
            self.telegram.bot_token
        )
    }
}

#[async_trait]
impl AlertTransport for TelegramTransport {
    fn name(&self) -> &'static str {
        "telegram"
    }

    #[instrument(skip(self, alert), fields(host = %alert.target.address))]
    async fn send(&self, alert: &DownAlert) -> Result<()> {
        let payload = json!({
            "chat_id": self.telegram.chat_id,
            "text": alert.message(),
        });

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .context("failed to send Telegram message")?;

        if !response.status().is_success() {
            bail!("Telegram message failed with status: {}", response.status());
        }

        info!("Successfully sent Telegram message");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: Client,
    webhook: Webhook,
}

impl WebhookTransport {
    pub fn new(client: Client, webhook: Webhook) -> Self {
        Self { client, webhook }
    }
}

#[async_trait]
impl AlertTransport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    #[instrument(skip(self, alert), fields(host = %alert.target.address))]
    async fn send(&self, alert: &DownAlert) -> Result<()> {
        let payload = json!({
            "message": alert.message(),
            "target": alert.target.name,
            "address": alert.target.address,
            "status": "down",
            "timestamp": alert.timestamp.to_rfc3339(),
        });

        let response = self
            .client
            .post(&self.webhook.url)
            .json(&payload)
            .send()
            .await
            .context("failed to send webhook alert")?;

        if !response.status().is_success() {
            bail!("Webhook alert failed with status: {}", response.status());
        }

        info!("Successfully sent webhook alert");
        Ok(())
    }
}

/// Fans down-transitions out to the configured transport
#[derive(Clone)]
pub struct AlertDispatcher {
    transport: Option<Arc<dyn AlertTransport>>,
    timeout: Duration,
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("transport", &self.transport.as_ref().map(|t| t.name()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::disabled()
    }
}

impl AlertDispatcher {
    pub fn new(transport: Arc<dyn AlertTransport>) -> Self {
        Self {
            transport: Some(transport),
            timeout: ALERT_TIMEOUT,
        }
    }

    pub fn disabled() -> Self {
        Self {
            transport: None,
            timeout: ALERT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a dispatcher for the configured alert channel.
    ///
    /// Missing or incomplete credentials yield a disabled dispatcher.
    pub fn from_config(alert: Option<&Alert>) -> Self {
        let Some(alert) = alert else {
            debug!("no alert channel configured");
            return Self::disabled();
        };

        let client = match Client::builder().timeout(ALERT_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                warn!("failed to build HTTP client, alerts disabled: {e}");
                return Self::disabled();
            }
        };

        let transport: Arc<dyn AlertTransport> = match alert {
            Alert::Telegram(telegram) => {
                if !telegram.is_configured() {
                    debug!("telegram alerts disabled or missing credentials");
                    return Self::disabled();
                }
                Arc::new(TelegramTransport::new(client, telegram.clone()))
            }
            Alert::Discord(discord) => Arc::new(DiscordTransport::new(client, discord.clone())),
            Alert::Webhook(webhook) => Arc::new(WebhookTransport::new(client, webhook.clone())),
        };

        Self::new(transport)
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    /// Dispatch an alert for a down-transition without waiting for delivery.
    ///
    /// Returns whether a delivery task was spawned. Up-transitions and a
    /// disabled dispatcher are no-ops.
    pub fn notify(&self, event: &TransitionEvent) -> bool {
        if !event.is_down() {
            return false;
        }

        let Some(transport) = self.transport.clone() else {
            trace!("alerts disabled, skipping {}", event.target);
            return false;
        };

        let alert = DownAlert::from(event);
        let timeout = self.timeout;

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, transport.send(&alert)).await {
                Ok(Ok(())) => debug!("alert for {} delivered via {}", alert.target, transport.name()),
                Ok(Err(e)) => warn!(
                    "alert for {} via {} dropped: {e:#}",
                    alert.target,
                    transport.name()
                ),
                Err(_) => warn!(
                    "alert for {} via {} timed out after {timeout:?}",
                    alert.target,
                    transport.name()
                ),
            }
        });

        true
    }
}
