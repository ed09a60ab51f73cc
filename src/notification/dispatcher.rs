//! Fans one notification out to every enabled channel.

use crate::config::NotificationsConfig;
use crate::core::{
    ChannelKind, ChannelPayload, ChannelSelector, ChannelSender, DeliveryOutcome, Notification,
};
use crate::formatting;
use crate::internal_metrics::Metrics;
use arc_swap::ArcSwap;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, Instrument};

/// The live notification settings, swapped whole on every update.
pub type SharedConfig = Arc<ArcSwap<NotificationsConfig>>;

/// The sender used for each channel kind.
#[derive(Clone)]
pub struct Senders {
    /// Slack, Teams and Discord.
    pub chat: Arc<dyn ChannelSender>,
    pub email: Arc<dyn ChannelSender>,
    pub webhook: Arc<dyn ChannelSender>,
}

impl Senders {
    pub fn for_kind(&self, kind: ChannelKind) -> &Arc<dyn ChannelSender> {
        match kind {
            ChannelKind::Slack | ChannelKind::Teams | ChannelKind::Discord => &self.chat,
            ChannelKind::Email => &self.email,
            ChannelKind::Webhook => &self.webhook,
        }
    }
}

/// Delivers notifications to the channels enabled in the shared config.
pub struct Dispatcher {
    config: SharedConfig,
    senders: Senders,
    metrics: Metrics,
}

impl Dispatcher {
    pub fn new(config: SharedConfig, senders: Senders) -> Self {
        Self {
            config,
            senders,
            metrics: Metrics::new(),
        }
    }

    pub fn senders(&self) -> &Senders {
        &self.senders
    }

    /// Attempts every selected channel that is enabled.
    ///
    /// Each attempt runs as its own task, so a failing, slow or panicking
    /// channel cannot affect the others. The call returns once every attempt
    /// has finished, with one outcome per attempted channel in
    /// `ChannelKind::ALL` order. It never fails.
    #[instrument(skip_all, fields(selector = ?selector, severity = %notification.severity))]
    pub async fn dispatch(
        &self,
        selector: ChannelSelector,
        notification: &Notification,
    ) -> Vec<DeliveryOutcome> {
        self.metrics.record_dispatch();
        let config = self.config.load_full();
        if !config.enabled {
            debug!("Notifications are globally disabled, nothing to dispatch");
            return Vec::new();
        }

        let start = Instant::now();
        let attempts: Vec<_> = ChannelKind::ALL
            .into_iter()
            .filter(|kind| selector.includes(*kind) && config.should_attempt(*kind))
            .map(|kind| {
                let payload = formatting::format(kind, notification, &config.channels);
                let sender = Arc::clone(self.senders.for_kind(kind));
                let handle = tokio::spawn(deliver(kind, sender, payload).in_current_span());
                async move {
                    handle.await.unwrap_or_else(|e| {
                        error!(channel = %kind, error = %e, "Delivery task failed");
                        DeliveryOutcome::failed(kind, format!("delivery task failed: {e}"))
                    })
                }
            })
            .collect();

        if attempts.is_empty() {
            debug!("No enabled channel matches the selector");
            return Vec::new();
        }

        let outcomes = join_all(attempts).await;

        for outcome in &outcomes {
            self.metrics.record_delivery(outcome.channel, outcome.success);
        }
        self.metrics.record_dispatch_duration(start.elapsed());

        let failed = outcomes.iter().filter(|o| !o.success).count();
        info!(
            attempted = outcomes.len(),
            failed,
            "Dispatch finished"
        );
        outcomes
    }

    /// Records how many alerts arrived in a batch.
    pub fn record_alerts(&self, count: usize) {
        self.metrics.record_alerts(count);
    }
}

async fn deliver(
    kind: ChannelKind,
    sender: Arc<dyn ChannelSender>,
    payload: ChannelPayload,
) -> DeliveryOutcome {
    match sender.deliver(&payload).await {
        Ok(result) => {
            debug!(channel = %kind, "Channel delivery succeeded");
            DeliveryOutcome::delivered(kind, result)
        }
        Err(e) => {
            error!(channel = %kind, error = %e, "Channel delivery failed");
            DeliveryOutcome::failed(kind, e)
        }
    }
}
