#![allow(dead_code)]
pub mod fake_sender;

use alertrelay::config::NotificationsConfig;
use alertrelay::notification::Senders;
use alertrelay::service::NotificationService;
use alertrelay::store::MemoryConfigStore;
use fake_sender::FakeSender;
use std::sync::Arc;

/// Settings with every channel enabled and distinct URLs per chat channel.
pub fn all_channels_enabled() -> NotificationsConfig {
    let mut config = NotificationsConfig::default();
    config.channels.slack.enabled = true;
    config.channels.slack.webhook_url = "https://hooks.slack.test/services/x".to_string();
    config.channels.teams.enabled = true;
    config.channels.teams.webhook_url = "https://teams.test/webhook".to_string();
    config.channels.discord.enabled = true;
    config.channels.discord.webhook_url = "https://discord.test/api/webhooks/x".to_string();
    config.channels.email.enabled = true;
    config.channels.webhook.enabled = true;
    config
}

/// A service whose every channel goes to the one `FakeSender`.
pub fn service_with_fake(
    config: NotificationsConfig,
    fake: Arc<FakeSender>,
) -> (NotificationService, Arc<MemoryConfigStore>) {
    let store = Arc::new(MemoryConfigStore::new());
    let senders = Senders {
        chat: fake.clone(),
        email: fake.clone(),
        webhook: fake,
    };
    (NotificationService::new(config, store.clone(), senders), store)
}
