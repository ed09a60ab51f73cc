//! The notification service: the operations callers use.
//!
//! - `send`: validate a direct request and dispatch it
//! - `process_alert_batch`: dispatch every alert of an Alertmanager webhook
//! - `test`: dispatch a canned notification
//! - `get_config` / `set_config`: read and update the channel settings

use crate::alerts::{self, AlertBatch};
use crate::config::NotificationsConfig;
use crate::core::{ChannelSelector, DeliveryOutcome, Message, Metadata, Notification, Severity};
use crate::error::NotifyError;
use crate::notification::{Dispatcher, HttpSender, Senders, SharedConfig, SmtpSender};
use crate::store::ConfigStore;
use anyhow::Result;
use arc_swap::ArcSwap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// A direct notification request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SendRequest {
    /// `all` or a channel name.
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl SendRequest {
    pub fn new(channel: impl Into<String>, message: Message) -> Self {
        Self {
            channel: Some(channel.into()),
            message: Some(message),
            ..Default::default()
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub struct NotificationService {
    config: SharedConfig,
    store: Arc<dyn ConfigStore>,
    dispatcher: Dispatcher,
    /// Serializes config updates; readers never wait on it.
    update_lock: Mutex<()>,
}

impl NotificationService {
    /// Builds a service from explicit parts.
    pub fn new(config: NotificationsConfig, store: Arc<dyn ConfigStore>, senders: Senders) -> Self {
        let config: SharedConfig = Arc::new(ArcSwap::from_pointee(config));
        let dispatcher = Dispatcher::new(config.clone(), senders);
        Self {
            config,
            store,
            dispatcher,
            update_lock: Mutex::new(()),
        }
    }

    /// Loads the settings from `store` (or defaults) and wires the real
    /// HTTP and SMTP senders.
    pub async fn from_store(store: Arc<dyn ConfigStore>) -> Result<Self> {
        let config = match store.load().await? {
            Some(config) => config,
            None => {
                info!("No stored notification settings, starting from defaults");
                NotificationsConfig::default()
            }
        };

        let http = Arc::new(HttpSender::new()?);
        let senders = Senders {
            chat: http.clone(),
            email: Arc::new(SmtpSender::new(&config.channels.email)),
            webhook: http,
        };
        Ok(Self::new(config, store, senders))
    }

    /// Validates and dispatches a direct request.
    #[instrument(skip_all)]
    pub async fn send(&self, request: SendRequest) -> Result<Vec<DeliveryOutcome>, NotifyError> {
        let channel = request
            .channel
            .filter(|c| !c.trim().is_empty())
            .ok_or(NotifyError::MissingField("channel"))?;
        let message = request
            .message
            .filter(|m| !m.is_empty())
            .ok_or(NotifyError::MissingField("message"))?;
        let selector: ChannelSelector = channel.parse()?;

        let notification = Notification::new(
            message,
            request.severity.unwrap_or_default(),
            request.metadata.unwrap_or_default(),
        );
        Ok(self.dispatcher.dispatch(selector, &notification).await)
    }

    /// Dispatches every alert of the batch on its own.
    ///
    /// Returns one outcome list per alert, in batch order.
    #[instrument(skip_all, fields(alerts = batch.alerts.len(), receiver = ?batch.receiver))]
    pub async fn process_alert_batch(&self, batch: &AlertBatch) -> Vec<Vec<DeliveryOutcome>> {
        self.dispatcher.record_alerts(batch.alerts.len());
        let notifications = alerts::adapt(batch);
        let dispatches = notifications
            .iter()
            .map(|n| self.dispatcher.dispatch(ChannelSelector::All, n));
        join_all(dispatches).await
    }

    /// Sends a canned info notification to `channel` (`all` or a channel name).
    #[instrument(skip(self))]
    pub async fn test(&self, channel: &str) -> Result<Vec<DeliveryOutcome>, NotifyError> {
        let request = SendRequest::new(
            channel,
            Message::new(
                "Test Notification",
                "This is a test notification from the alert relay.",
            ),
        )
        .with_severity(Severity::Info)
        .with_metadata(Metadata {
            service: Some("alertrelay".to_string()),
            ..Default::default()
        });
        self.send(request).await
    }

    /// The current settings snapshot.
    pub fn get_config(&self) -> Arc<NotificationsConfig> {
        self.config.load_full()
    }

    /// Merges `patch` into the settings, swaps them in and persists them.
    ///
    /// A failed save is logged and the new settings stay active. The email
    /// transport is rebuilt when the email settings changed.
    #[instrument(skip_all)]
    pub async fn set_config(&self, patch: &Value) -> Result<Arc<NotificationsConfig>, NotifyError> {
        let _guard = self.update_lock.lock().await;

        let previous = self.config.load_full();
        let updated = Arc::new(previous.merged(patch)?);
        self.config.store(updated.clone());
        info!("Notification settings updated");

        if previous.channels.email != updated.channels.email {
            self.dispatcher.senders().email.reconfigure(&updated);
        }

        if let Err(e) = self.store.save(&updated).await {
            error!(error = %e, "Failed to persist notification settings; keeping them in memory");
        }

        if !updated.enabled {
            warn!("Notifications are globally disabled");
        }
        Ok(updated)
    }
}
