//! Core domain types and service traits for the alert relay
//!
//! This module defines the normalized notification record that every
//! formatter consumes, the channel vocabulary, the delivery outcome records
//! returned to callers, and the `ChannelSender` seam that performs I/O.

use crate::config::{NotificationsConfig, WebhookEndpoint};
use crate::error::{ChannelError, NotifyError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The human-facing part of a notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        alias = "description",
        alias = "message",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<String>,
}

impl Message {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
        }
    }

    /// The title to render, `"Alert"` when none was given.
    pub fn title(&self) -> &str {
        non_empty(&self.title).unwrap_or("Alert")
    }

    /// The body to render, empty when none was given.
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    /// True when neither a title nor a body was supplied.
    pub fn is_empty(&self) -> bool {
        non_empty(&self.title).is_none() && non_empty(&self.body).is_none()
    }
}

/// Urgency level of a notification.
///
/// Unrecognized labels are kept in `Other` so they can still be shown to the
/// reader; they are styled like `Info`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Critical,
    Warning,
    #[default]
    Info,
    Resolved,
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Resolved => "resolved",
            Severity::Other(label) => label,
        }
    }

    /// The uppercased label used in subjects and severity fields.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl From<&str> for Severity {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            "info" | "" => Severity::Info,
            "resolved" => Severity::Resolved,
            _ => Severity::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Severity::from(value.as_str())
    }
}

impl From<Severity> for String {
    fn from(value: Severity) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contextual information attached to a notification.
///
/// None of the keys are required. Empty strings are treated as absent by the
/// accessors, which is what the formatters use to decide which fields appear.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runbook_url: Option<String>,
    /// Overrides the chat channel the message is posted to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Alert status (`firing` / `resolved`) when the notification came from an alert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Free-form extension fields, passed through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Metadata {
    pub fn instance(&self) -> Option<&str> {
        non_empty(&self.instance)
    }

    pub fn service(&self) -> Option<&str> {
        non_empty(&self.service)
    }

    pub fn component(&self) -> Option<&str> {
        non_empty(&self.component)
    }

    pub fn runbook_url(&self) -> Option<&str> {
        non_empty(&self.runbook_url)
    }

    pub fn channel(&self) -> Option<&str> {
        non_empty(&self.channel)
    }

    /// The labelled context fields that are present, in display order.
    pub fn context_fields(&self) -> Vec<(&'static str, &str)> {
        [
            ("Instance", self.instance()),
            ("Service", self.service()),
            ("Component", self.component()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| (label, v)))
        .collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// A normalized notification, ready to be formatted for any channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: Message,
    pub severity: Severity,
    pub metadata: Metadata,
    /// Generation time, embedded in every payload.
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: Message, severity: Severity, metadata: Metadata) -> Self {
        Self {
            message,
            severity,
            metadata,
            timestamp: Utc::now(),
        }
    }

    /// ISO 8601 rendering of the generation time, millisecond precision.
    pub fn iso_timestamp(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// A notification destination kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Slack,
    Teams,
    Discord,
    Email,
    Webhook,
}

impl ChannelKind {
    /// Every kind, in dispatch order.
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Slack,
        ChannelKind::Teams,
        ChannelKind::Discord,
        ChannelKind::Email,
        ChannelKind::Webhook,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Slack => "slack",
            ChannelKind::Teams => "teams",
            ChannelKind::Discord => "discord",
            ChannelKind::Email => "email",
            ChannelKind::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" | "chat" => Ok(ChannelKind::Slack),
            "teams" => Ok(ChannelKind::Teams),
            "discord" => Ok(ChannelKind::Discord),
            "email" => Ok(ChannelKind::Email),
            "webhook" | "webhooks" => Ok(ChannelKind::Webhook),
            _ => Err(NotifyError::UnknownChannel(s.to_string())),
        }
    }
}

/// Which channels a dispatch targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelector {
    All,
    Only(ChannelKind),
}

impl ChannelSelector {
    pub fn includes(&self, kind: ChannelKind) -> bool {
        match self {
            ChannelSelector::All => true,
            ChannelSelector::Only(only) => *only == kind,
        }
    }
}

impl FromStr for ChannelSelector {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(NotifyError::MissingField("channel"));
        }
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(ChannelSelector::All);
        }
        trimmed.parse().map(ChannelSelector::Only)
    }
}

/// The result of one channel delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(channel: ChannelKind, result: Value) -> Self {
        Self {
            channel,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(channel: ChannelKind, error: impl fmt::Display) -> Self {
        Self {
            channel,
            success: false,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

/// The result of one generic webhook endpoint delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointOutcome {
    pub name: String,
    pub url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A rendered email, ready to be handed to a mail transport.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// A channel-specific wire payload together with its destination.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPayload {
    /// A single JSON POST to a chat webhook.
    Post { url: String, body: Value },
    /// An HTML email.
    Email(EmailContent),
    /// The same JSON body posted to every configured endpoint.
    Endpoints {
        endpoints: Vec<WebhookEndpoint>,
        body: Value,
    },
}

// =============================================================================
// Service Traits
// =============================================================================

/// Delivers prepared payloads to their destination.
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// Delivers the payload.
    ///
    /// # Returns
    /// * `Ok(Value)` describing what was delivered (status code, SMTP reply,
    ///   per-endpoint results...)
    /// * `Err` if the delivery failed as a whole
    async fn deliver(&self, payload: &ChannelPayload) -> Result<Value, ChannelError>;

    /// Called after the channel's settings changed. Senders that hold a
    /// long-lived transport rebuild it here.
    fn reconfigure(&self, _config: &NotificationsConfig) {}
}
