//! Integration tests for Alertmanager batch processing.

use alertrelay::alerts::AlertBatch;
use alertrelay::config::NotificationsConfig;
use alertrelay::core::{ChannelKind, ChannelPayload};
use serde_json::json;
use std::sync::Arc;

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::fake_sender::FakeSender;
use helpers::service_with_fake;

fn slack_only() -> NotificationsConfig {
    let mut config = NotificationsConfig::default();
    config.channels.slack.enabled = true;
    config
}

fn slack_bodies(fake: &FakeSender) -> Vec<serde_json::Value> {
    fake.delivered()
        .into_iter()
        .filter_map(|p| match p {
            ChannelPayload::Post { body, .. } => Some(body),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_each_alert_is_dispatched_separately() {
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(slack_only(), fake.clone());

    let batch: AlertBatch = serde_json::from_value(json!({
        "version": "4",
        "status": "firing",
        "receiver": "relay",
        "alerts": [
            {
                "status": "firing",
                "labels": { "alertname": "HighCPU", "severity": "critical", "instance": "web-1" },
                "annotations": { "summary": "CPU is high", "description": "above 90%" }
            },
            {
                "status": "resolved",
                "labels": { "alertname": "DiskFull" },
                "annotations": {}
            }
        ]
    }))
    .unwrap();

    let results = service.process_alert_batch(&batch).await;

    assert_eq!(results.len(), 2);
    for outcomes in &results {
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].channel, ChannelKind::Slack);
        assert!(outcomes[0].success);
    }

    let mut bodies = slack_bodies(&fake);
    assert_eq!(bodies.len(), 2);
    bodies.sort_by_key(|b| b["attachments"][0]["title"].as_str().unwrap_or_default().to_string());

    assert_eq!(bodies[0]["attachments"][0]["title"], "CPU is high");
    assert_eq!(bodies[0]["attachments"][0]["color"], "danger");
    assert_eq!(bodies[1]["attachments"][0]["title"], "DiskFull");
    assert_eq!(bodies[1]["text"], "✅ *DiskFull*");
}

#[tokio::test]
async fn test_alertname_only_alert() {
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(slack_only(), fake.clone());

    let batch: AlertBatch = serde_json::from_value(json!({
        "alerts": [{ "labels": { "alertname": "X" } }]
    }))
    .unwrap();

    let results = service.process_alert_batch(&batch).await;
    assert_eq!(results.len(), 1);

    let body = &slack_bodies(&fake)[0];
    assert_eq!(body["attachments"][0]["title"], "X");
    assert_eq!(body["attachments"][0]["text"], "");
    assert_eq!(body["attachments"][0]["color"], "good");
    assert_eq!(body["attachments"][0]["fields"][0]["value"], "INFO");
}

#[tokio::test]
async fn test_empty_batch_dispatches_nothing() {
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(slack_only(), fake.clone());

    let batch: AlertBatch = serde_json::from_value(json!({ "alerts": [] })).unwrap();

    assert!(service.process_alert_batch(&batch).await.is_empty());
    assert_eq!(fake.count(), 0);
}

#[tokio::test]
async fn test_disabled_relay_still_reports_every_alert() {
    let mut config = slack_only();
    config.enabled = false;
    let fake = Arc::new(FakeSender::new());
    let (service, _) = service_with_fake(config, fake.clone());

    let batch: AlertBatch = serde_json::from_value(json!({
        "alerts": [{ "labels": { "alertname": "A" } }, { "labels": { "alertname": "B" } }]
    }))
    .unwrap();

    let results = service.process_alert_batch(&batch).await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|outcomes| outcomes.is_empty()));
    assert_eq!(fake.count(), 0);
}
