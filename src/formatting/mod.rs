//! Channel payload formatting.
//!
//! Every function here is pure: it maps a `Notification` and the settings of
//! one channel to that channel's wire payload. Formatting cannot fail; absent
//! optional fields are simply left out.

pub mod email;

use crate::config::{ChannelsConfig, DiscordConfig, SlackConfig, TeamsConfig, WebhookConfig};
use crate::core::{ChannelKind, ChannelPayload, Notification, Severity};
use serde_json::{json, Value};

/// Identifies this relay in generic webhook payloads and message footers.
pub const SOURCE: &str = "devops-monitor";

/// Visual styling for a severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appearance {
    /// Slack attachment color keyword.
    pub slack_color: &'static str,
    /// CSS/Teams color, `#rrggbb`.
    pub hex: &'static str,
    /// Discord embed color.
    pub rgb: u32,
    pub emoji: &'static str,
}

const CRITICAL: Appearance = Appearance {
    slack_color: "danger",
    hex: "#dc3545",
    rgb: 0xdc3545,
    emoji: "🚨",
};

const WARNING: Appearance = Appearance {
    slack_color: "warning",
    hex: "#fd7e14",
    rgb: 0xfd7e14,
    emoji: "⚠️",
};

const INFO: Appearance = Appearance {
    slack_color: "good",
    hex: "#28a745",
    rgb: 0x28a745,
    emoji: "ℹ️",
};

const RESOLVED: Appearance = Appearance {
    slack_color: "good",
    hex: "#28a745",
    rgb: 0x28a745,
    emoji: "✅",
};

/// Returns the styling for a severity. Unknown severities look like `Info`.
pub fn appearance(severity: &Severity) -> Appearance {
    match severity {
        Severity::Critical => CRITICAL,
        Severity::Warning => WARNING,
        Severity::Info | Severity::Other(_) => INFO,
        Severity::Resolved => RESOLVED,
    }
}

/// Builds the payload for `kind` from the current channel settings.
pub fn format(kind: ChannelKind, notification: &Notification, channels: &ChannelsConfig) -> ChannelPayload {
    match kind {
        ChannelKind::Slack => ChannelPayload::Post {
            url: channels.slack.webhook_url.clone(),
            body: slack_payload(notification, &channels.slack),
        },
        ChannelKind::Teams => ChannelPayload::Post {
            url: channels.teams.webhook_url.clone(),
            body: teams_payload(notification, &channels.teams),
        },
        ChannelKind::Discord => ChannelPayload::Post {
            url: channels.discord.webhook_url.clone(),
            body: discord_payload(notification, &channels.discord),
        },
        ChannelKind::Email => ChannelPayload::Email(email::render(notification, &channels.email)),
        ChannelKind::Webhook => webhook_payload(notification, &channels.webhook),
    }
}

/// A Slack incoming-webhook message with one colored attachment.
pub fn slack_payload(notification: &Notification, config: &SlackConfig) -> Value {
    let look = appearance(&notification.severity);
    let title = notification.message.title();

    let mut fields = vec![
        json!({ "title": "Severity", "value": notification.severity.label(), "short": true }),
        json!({ "title": "Time", "value": notification.iso_timestamp(), "short": true }),
    ];
    for (label, value) in notification.metadata.context_fields() {
        fields.push(json!({ "title": label, "value": value, "short": true }));
    }

    let mut attachment = json!({
        "color": look.slack_color,
        "title": title,
        "text": notification.message.body(),
        "fields": fields,
        "footer": SOURCE,
        "ts": notification.timestamp.timestamp(),
    });
    if let Some(url) = notification.metadata.runbook_url() {
        attachment["actions"] = json!([{ "type": "button", "text": "View Runbook", "url": url }]);
    }

    let channel = notification
        .metadata
        .channel()
        .unwrap_or(config.default_channel.as_str());

    json!({
        "channel": channel,
        "username": config.username,
        "icon_emoji": config.icon_emoji,
        "text": format!("{} *{}*", look.emoji, title),
        "attachments": [attachment],
    })
}

/// A Teams `MessageCard`.
pub fn teams_payload(notification: &Notification, config: &TeamsConfig) -> Value {
    let look = appearance(&notification.severity);
    let title = notification.message.title();

    let mut facts = vec![
        json!({ "name": "Severity", "value": notification.severity.label() }),
        json!({ "name": "Time", "value": notification.iso_timestamp() }),
    ];
    for (label, value) in notification.metadata.context_fields() {
        facts.push(json!({ "name": label, "value": value }));
    }

    let mut card = json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "themeColor": look.hex.trim_start_matches('#'),
        "summary": title,
        "sections": [{
            "activityTitle": format!("{} {}", look.emoji, title),
            "activitySubtitle": config.title,
            "text": notification.message.body(),
            "facts": facts,
            "markdown": true,
        }],
    });
    if let Some(url) = notification.metadata.runbook_url() {
        card["potentialAction"] = json!([{
            "@type": "OpenUri",
            "name": "View Runbook",
            "targets": [{ "os": "default", "uri": url }],
        }]);
    }
    card
}

/// A Discord webhook message with one embed.
pub fn discord_payload(notification: &Notification, config: &DiscordConfig) -> Value {
    let look = appearance(&notification.severity);
    let title = notification.message.title();

    let mut fields = vec![json!({
        "name": "Severity",
        "value": notification.severity.label(),
        "inline": true,
    })];
    for (label, value) in notification.metadata.context_fields() {
        fields.push(json!({ "name": label, "value": value, "inline": true }));
    }
    if let Some(url) = notification.metadata.runbook_url() {
        fields.push(json!({ "name": "Runbook", "value": format!("[View Runbook]({url})"), "inline": false }));
    }

    let mut payload = json!({
        "username": config.username,
        "embeds": [{
            "title": format!("{} {}", look.emoji, title),
            "description": notification.message.body(),
            "color": look.rgb,
            "timestamp": notification.iso_timestamp(),
            "fields": fields,
            "footer": { "text": SOURCE },
        }],
    });
    if !config.avatar_url.is_empty() {
        payload["avatar_url"] = json!(config.avatar_url);
    }
    payload
}

/// The uniform generic webhook body, posted to every configured endpoint.
pub fn webhook_payload(notification: &Notification, config: &WebhookConfig) -> ChannelPayload {
    ChannelPayload::Endpoints {
        endpoints: config.endpoints.clone(),
        body: json!({
            "message": notification.message,
            "severity": notification.severity,
            "metadata": notification.metadata,
            "timestamp": notification.iso_timestamp(),
            "source": SOURCE,
        }),
    }
}
