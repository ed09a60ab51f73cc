//! Integration tests for process configuration and runtime settings updates.

use alertrelay::cli::Cli;
use alertrelay::config::{Config, NotificationsConfig};
use alertrelay::core::ChannelKind;
use alertrelay::error::NotifyError;
use alertrelay::service::NotificationService;
use alertrelay::store::{ConfigStore, FileConfigStore};
use serde_json::json;
use std::sync::Arc;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::fake_sender::FakeSender;
use helpers::service_with_fake;

// Environment variables are process-wide, so every `Config::load` check lives
// in this one test.
#[test]
fn test_config_layering() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alertrelay.toml");
    std::fs::write(
        &path,
        r#"
log_level = "debug"

[server]
listen_addr = "127.0.0.1:9000"

[metrics]
enabled = false
"#,
    )
    .unwrap();

    let missing = Cli {
        config: Some(dir.path().join("absent.toml")),
        ..Default::default()
    };
    assert_eq!(Config::load(&missing).unwrap(), Config::default());

    let from_file = Cli {
        config: Some(path.clone()),
        ..Default::default()
    };
    let config = Config::load(&from_file).unwrap();
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.server.listen_addr.port(), 9000);
    assert!(!config.metrics.enabled);
    assert_eq!(config.store.path, Config::default().store.path);

    std::env::set_var("ALERTRELAY_STORE__PATH", "/tmp/from-env.yaml");
    std::env::set_var("ALERTRELAY_LOG_LEVEL", "warn");
    let config = Config::load(&from_file).unwrap();
    assert_eq!(config.store.path.to_str(), Some("/tmp/from-env.yaml"));
    assert_eq!(config.log_level, "warn");

    let with_args = Cli {
        config: Some(path),
        listen: Some("127.0.0.1:9100".parse().unwrap()),
        log_level: Some("trace".to_string()),
        ..Default::default()
    };
    let config = Config::load(&with_args).unwrap();
    std::env::remove_var("ALERTRELAY_STORE__PATH");
    std::env::remove_var("ALERTRELAY_LOG_LEVEL");

    assert_eq!(config.server.listen_addr.port(), 9100);
    assert_eq!(config.log_level, "trace");
    assert_eq!(config.store.path.to_str(), Some("/tmp/from-env.yaml"));
}

#[tokio::test]
async fn test_set_then_get_round_trip() {
    let fake = Arc::new(FakeSender::new());
    let (service, store) = service_with_fake(NotificationsConfig::default(), fake);

    let updated = service
        .set_config(&json!({
            "channels": {
                "teams": { "enabled": true, "webhook_url": "https://teams.test/hook" },
                "webhook": { "enabled": true, "endpoints": [{ "url": "https://a.test" }] }
            }
        }))
        .await
        .unwrap();

    let current = service.get_config();
    assert_eq!(*current, *updated);
    assert!(current.should_attempt(ChannelKind::Teams));
    assert_eq!(current.channels.teams.webhook_url, "https://teams.test/hook");
    assert_eq!(current.channels.teams.title, "DevOps Monitor Alert");
    assert_eq!(current.channels.webhook.endpoints.len(), 1);
    assert_eq!(store.stored().as_ref(), Some(&*current));
}

#[tokio::test]
async fn test_update_takes_effect_on_next_dispatch() {
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(NotificationsConfig::default(), fake.clone());

    assert!(service.test("all").await.unwrap().is_empty());

    service
        .set_config(&json!({ "channels": { "discord": { "enabled": true } } }))
        .await
        .unwrap();

    let outcomes = service.test("all").await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].channel, ChannelKind::Discord);
}

#[tokio::test]
async fn test_persist_failure_keeps_update_in_memory() {
    let fake = Arc::new(FakeSender::new());
    let (service, store) = service_with_fake(NotificationsConfig::default(), fake);
    store.fail_saves(true);

    service
        .set_config(&json!({ "channels": { "slack": { "enabled": true } } }))
        .await
        .unwrap();

    assert!(service.get_config().channels.slack.enabled);
    assert!(store.stored().is_none());
}

#[tokio::test]
async fn test_concurrent_updates_are_not_lost() {
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(NotificationsConfig::default(), fake);
    let service = Arc::new(service);

    let updates = ["slack", "teams", "discord", "email", "webhook"].map(|name| {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .set_config(&json!({ "channels": { name: { "enabled": true } } }))
                .await
                .unwrap();
        })
    });
    for update in updates {
        update.await.unwrap();
    }

    let config = service.get_config();
    for kind in ChannelKind::ALL {
        assert!(config.channels.is_enabled(kind), "{kind} update was lost");
    }
}

#[tokio::test]
async fn test_settings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notifications.yaml");

    let service = NotificationService::from_store(Arc::new(FileConfigStore::new(&path)))
        .await
        .unwrap();
    service
        .set_config(&json!({
            "channels": { "slack": { "enabled": true, "default_channel": "#ops" } }
        }))
        .await
        .unwrap();
    drop(service);

    let store = FileConfigStore::new(&path);
    let persisted = store.load().await.unwrap().unwrap();
    assert_eq!(persisted.channels.slack.default_channel, "#ops");

    let restarted = NotificationService::from_store(Arc::new(store)).await.unwrap();
    assert!(restarted.get_config().channels.slack.enabled);
}

#[tokio::test]
async fn test_chat_key_updates_slack_and_typos_are_rejected() {
    let fake = Arc::new(FakeSender::new());
    let (service, store) = service_with_fake(NotificationsConfig::default(), fake);

    let updated = service
        .set_config(&json!({ "channels": { "chat": { "enabled": true } } }))
        .await
        .unwrap();
    assert!(updated.channels.slack.enabled);
    assert!(service.get_config().should_attempt(ChannelKind::Slack));

    let before = service.get_config();
    let result = service
        .set_config(&json!({ "channels": { "slak": { "enabled": false } } }))
        .await;
    assert!(matches!(result, Err(NotifyError::InvalidConfig(_))));
    assert_eq!(service.get_config(), before);
    assert_eq!(store.stored().as_ref(), Some(&*before));
}
