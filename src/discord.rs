use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::alerts::{AlertTransport, DownAlert};
use crate::config::Discord;

/// Embed color for a host that went down
const COLOR_DOWN: u32 = 15158332;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Default)]
pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl ToString) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn add_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn build(self) -> Message {
        Message {
            content: self.content,
            embeds: self.embeds,
        }
    }
}

pub fn build_down_embed(alert: &DownAlert) -> Embed {
    Embed {
        title: Some("🔴 Host Down".to_string()),
        description: Some(format!("Host **{}** stopped answering", alert.target.name)),
        color: Some(COLOR_DOWN),
        fields: vec![
            EmbedField {
                name: "📡 Address".to_string(),
                value: format!("`{}`", alert.target.address),
                inline: true,
            },
            EmbedField {
                name: "🕒 Detected".to_string(),
                value: alert.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                inline: true,
            },
        ],
        footer: Some(EmbedFooter {
            text: format!("pingwatch | {}", alert.target.address),
        }),
        timestamp: Some(Utc::now().to_rfc3339()),
    }
}

#[derive(Debug, Clone)]
pub struct DiscordTransport {
    client: Client,
    discord: Discord,
}

impl DiscordTransport {
    pub fn new(client: Client, discord: Discord) -> Self {
        Self { client, discord }
    }

    pub fn build_message(&self, alert: &DownAlert) -> Message {
        let mut builder = MessageBuilder::new().add_embed(build_down_embed(alert));
        if let Some(user_id) = &self.discord.user_id {
            builder = builder.content(format!("🔴 `{}` <@{user_id}>", alert.target));
        }
        builder.build()
    }
}

#[async_trait]
impl AlertTransport for DiscordTransport {
    fn name(&self) -> &'static str {
        "discord"
    }

    #[instrument(skip(self, alert), fields(host = %alert.target.address))]
    async fn send(&self, alert: &DownAlert) -> Result<()> {
        let message = self.build_message(alert);
        let response = self
            .client
            .post(&self.discord.url)
            .json(&message)
            .send()
            .await
            .context("failed to send Discord message")?;

        if !response.status().is_success() {
            let status = response.status();
            if let Ok(error_text) = response.text().await {
                error!("Discord API error response: {}", error_text);
            }
            bail!("Discord message failed with status: {}", status);
        }

        info!("Successfully sent Discord message");
        Ok(())
    }
}
