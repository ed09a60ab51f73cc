//! Configuration management for the alert relay
//!
//! Two configuration trees live here. `Config` holds the process settings
//! (logging, listen address, where the notification settings are stored) and
//! is loaded once with `figment` from defaults, an `alertrelay.toml` file,
//! `ALERTRELAY_` environment variables and command-line arguments.
//!
//! `NotificationsConfig` holds the channel settings. It is persisted through a
//! `ConfigStore` and can be changed at runtime with a JSON merge patch.

use crate::cli::Cli;
use crate::core::ChannelKind;
use crate::error::NotifyError;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default location of the process configuration file.
pub const DEFAULT_CONFIG_FILE: &str = "alertrelay.toml";

/// Timeout applied to a generic webhook endpoint that does not set its own.
pub const DEFAULT_ENDPOINT_TIMEOUT_MS: u64 = 5000;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level (an `EnvFilter` directive).
    pub log_level: String,
    /// Configuration for the HTTP API.
    pub server: ServerConfig,
    /// Where the notification settings are persisted.
    pub store: StoreConfig,
    /// Configuration for the Prometheus endpoint.
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the HTTP API binds to.
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Path of the notification settings file (`.yaml`/`.yml` or `.json`).
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Expose `/metrics` in Prometheus format.
    pub enabled: bool,
}

impl Config {
    /// Loads the application configuration.
    ///
    /// Sources are layered: built-in defaults, the TOML file named by
    /// `--config` (or `alertrelay.toml`), `ALERTRELAY_` environment variables
    /// (`__` separates nested keys) and finally explicit CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ALERTRELAY_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            server: ServerConfig {
                listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            store: StoreConfig {
                path: PathBuf::from("notifications.yaml"),
            },
            metrics: MetricsConfig { enabled: true },
        }
    }
}

// =============================================================================
// Notification settings
// =============================================================================

/// The root of the persisted notification settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Master switch. When false nothing is dispatched.
    pub enabled: bool,
    pub channels: ChannelsConfig,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channels: ChannelsConfig::default(),
        }
    }
}

impl NotificationsConfig {
    /// Whether a dispatch should attempt the given channel.
    pub fn should_attempt(&self, kind: ChannelKind) -> bool {
        self.enabled && self.channels.is_enabled(kind)
    }

    /// Returns a copy of this config with `patch` merged in.
    ///
    /// The patch is a partial JSON document. Objects are merged key by key,
    /// any other value (including arrays) replaces the current one. Keys the
    /// patch does not mention keep their current value. A key that names no
    /// setting rejects the whole patch. `channels.chat` is accepted as the
    /// name of the Slack block.
    pub fn merged(&self, patch: &Value) -> Result<Self, NotifyError> {
        if !patch.is_object() {
            return Err(NotifyError::InvalidConfig(
                "update must be a JSON object".to_string(),
            ));
        }
        let patch = normalize_channel_names(patch.clone())?;
        let mut current = serde_json::to_value(self)
            .map_err(|e| NotifyError::InvalidConfig(e.to_string()))?;
        merge_value(&mut current, &patch, "")?;
        serde_json::from_value(current).map_err(|e| NotifyError::InvalidConfig(e.to_string()))
    }
}

/// Renames `channels.chat` to `channels.slack`.
fn normalize_channel_names(mut patch: Value) -> Result<Value, NotifyError> {
    if let Some(Value::Object(channels)) = patch.get_mut("channels") {
        if let Some(chat) = channels.remove("chat") {
            if channels.contains_key("slack") {
                return Err(NotifyError::InvalidConfig(
                    "`channels.chat` and `channels.slack` name the same channel".to_string(),
                ));
            }
            channels.insert("slack".to_string(), chat);
        }
    }
    Ok(patch)
}

fn merge_value(target: &mut Value, patch: &Value, path: &str) -> Result<(), NotifyError> {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                let key_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                let existing = target
                    .get_mut(key)
                    .ok_or_else(|| NotifyError::InvalidConfig(format!("unknown setting `{key_path}`")))?;
                merge_value(existing, value, &key_path)?;
            }
        }
        (target, patch) => *target = patch.clone(),
    }
    Ok(())
}

/// Settings for every channel kind.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct ChannelsConfig {
    pub slack: SlackConfig,
    pub teams: TeamsConfig,
    pub discord: DiscordConfig,
    pub email: EmailConfig,
    pub webhook: WebhookConfig,
}

impl ChannelsConfig {
    pub fn is_enabled(&self, kind: ChannelKind) -> bool {
        match kind {
            ChannelKind::Slack => self.slack.enabled,
            ChannelKind::Teams => self.teams.enabled,
            ChannelKind::Discord => self.discord.enabled,
            ChannelKind::Email => self.email.enabled,
            ChannelKind::Webhook => self.webhook.enabled,
        }
    }
}

/// Slack-style incoming webhook.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub webhook_url: String,
    /// Channel used unless the notification metadata names another one.
    pub default_channel: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: "https://hooks.slack.com/services/YOUR/WEBHOOK/URL".to_string(),
            default_channel: "#alerts".to_string(),
            username: "DevOps Monitor".to_string(),
            icon_emoji: ":warning:".to_string(),
        }
    }
}

/// Microsoft Teams incoming webhook.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct TeamsConfig {
    pub enabled: bool,
    pub webhook_url: String,
    /// Subtitle shown under every card title.
    pub title: String,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: "https://outlook.office.com/webhook/YOUR/WEBHOOK/URL".to_string(),
            title: "DevOps Monitor Alert".to_string(),
        }
    }
}

/// Discord webhook.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook_url: String,
    pub username: String,
    pub avatar_url: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url: "https://discord.com/api/webhooks/YOUR/WEBHOOK/URL".to_string(),
            username: "DevOps Monitor".to_string(),
            avatar_url: String::new(),
        }
    }
}

/// SMTP email delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp: SmtpConfig,
    pub from: String,
    pub to: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp: SmtpConfig::default(),
            from: "alerts@example.com".to_string(),
            to: vec!["admin@example.com".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// Use implicit TLS. When false the connection starts plain and is
    /// upgraded with STARTTLS if the server offers it.
    pub secure: bool,
    pub auth: SmtpAuth,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: "smtp.example.com".to_string(),
            port: 587,
            secure: false,
            auth: SmtpAuth::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct SmtpAuth {
    pub user: String,
    pub pass: String,
}

/// Generic HTTP webhooks.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub endpoints: Vec<WebhookEndpoint>,
}

/// One generic webhook destination.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WebhookEndpoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl WebhookEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: None,
        }
    }

    /// The name used in results, falling back to the URL.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_ENDPOINT_TIMEOUT_MS)
    }
}
