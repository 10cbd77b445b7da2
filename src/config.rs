use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, trace};

use crate::Target;
use crate::error::{ConfigError, ConfigResult};
use crate::util;

/// Hosts watched when the configuration names none
const DEFAULT_TARGETS: &[(&str, &str)] = &[
    ("Google DNS", "8.8.8.8"),
    ("Cloudflare DNS", "1.1.1.1"),
    ("Yandex", "ya.ru"),
    ("Router", "192.168.1.1"),
];

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,

    /// Seconds between two probing rounds
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Seconds a single probe may take before it counts as down
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between engine start and the first round
    #[serde(default = "default_start_delay")]
    pub start_delay: u64,

    /// Latency samples kept per target
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    pub alert: Option<Alert>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            interval: default_interval(),
            timeout: default_timeout(),
            start_delay: default_start_delay(),
            history_capacity: default_history_capacity(),
            alert: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Alert {
    Telegram(Telegram),
    Discord(Discord),
    Webhook(Webhook),
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Telegram {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl Telegram {
    /// Alerts only go out when enabled and both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.bot_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Webhook {
    pub url: String,
}

#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Discord {
    pub url: String,
    pub user_id: Option<String>,
}

/// Validated configuration as consumed by the engine
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub targets: Vec<Target>,
    pub interval: Duration,
    pub timeout: Duration,
    pub start_delay: Duration,
    pub history_capacity: usize,
    pub alert: Option<Alert>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            targets: vec![],
            interval: Duration::from_secs(default_interval()),
            timeout: Duration::from_secs(default_timeout()),
            start_delay: Duration::from_secs(default_start_delay()),
            history_capacity: default_history_capacity(),
            alert: None,
        }
    }
}

impl Config {
    pub fn resolve(self) -> ConfigResult<ResolvedConfig> {
        if self.interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        if self.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::InvalidHistoryCapacity);
        }

        Ok(ResolvedConfig {
            targets: resolve_targets(&self.targets)?,
            interval: Duration::from_secs(self.interval),
            timeout: Duration::from_secs(self.timeout),
            start_delay: Duration::from_secs(self.start_delay),
            history_capacity: self.history_capacity,
            alert: self.alert,
        })
    }

    /// Fill Telegram credentials from the environment.
    ///
    /// Without any alert configured, a complete token/chat pair in the
    /// environment enables Telegram alerts on its own.
    pub fn apply_env_overrides(&mut self) {
        let token = util::get_telegram_token();
        let chat_id = util::get_telegram_chat_id();

        match &mut self.alert {
            Some(Alert::Telegram(telegram)) => {
                if let Some(token) = token {
                    telegram.bot_token = token;
                }
                if let Some(chat_id) = chat_id {
                    telegram.chat_id = chat_id;
                }
            }
            None => {
                if let (Some(bot_token), Some(chat_id)) = (token, chat_id) {
                    debug!("enabling telegram alerts from environment");
                    self.alert = Some(Alert::Telegram(Telegram {
                        enabled: true,
                        bot_token,
                        chat_id,
                        api_base: default_telegram_api(),
                    }));
                }
            }
            Some(_) => {}
        }
    }
}

/// Validate configured targets and turn them into engine targets.
///
/// Names and addresses are trimmed, an empty name falls back to the address,
/// and empty or duplicate addresses are rejected.
pub fn resolve_targets(targets: &[TargetConfig]) -> ConfigResult<Vec<Target>> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(targets.len());

    for target in targets {
        let target = resolve_target(target)?;
        if !seen.insert(target.address.clone()) {
            return Err(ConfigError::DuplicateAddress(target.address));
        }
        resolved.push(target);
    }

    Ok(resolved)
}

pub fn resolve_target(target: &TargetConfig) -> ConfigResult<Target> {
    let address = target.address.trim();
    if address.is_empty() {
        return Err(ConfigError::EmptyAddress);
    }

    let name = match target.name.trim() {
        "" => address,
        name => name,
    };

    Ok(Target::new(name, address))
}

fn default_targets() -> Vec<TargetConfig> {
    DEFAULT_TARGETS
        .iter()
        .map(|(name, address)| TargetConfig {
            name: name.to_string(),
            address: address.to_string(),
        })
        .collect()
}

fn default_interval() -> u64 {
    5
}

fn default_timeout() -> u64 {
    2
}

fn default_start_delay() -> u64 {
    1
}

fn default_history_capacity() -> usize {
    200
}

fn default_telegram_api() -> String {
    TELEGRAM_API.to_string()
}

pub fn read_config_file(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
