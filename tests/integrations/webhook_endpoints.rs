//! Integration tests for the generic webhook channel against real HTTP servers.

use alertrelay::config::{NotificationsConfig, WebhookEndpoint};
use alertrelay::core::{ChannelKind, EndpointOutcome, Message, Metadata, Severity};
use alertrelay::notification::{HttpSender, Senders, SmtpSender};
use alertrelay::service::{NotificationService, SendRequest};
use alertrelay::store::MemoryConfigStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_service(config: NotificationsConfig) -> NotificationService {
    let http = Arc::new(HttpSender::new().unwrap());
    let senders = Senders {
        chat: http.clone(),
        email: Arc::new(SmtpSender::new(&config.channels.email)),
        webhook: http,
    };
    NotificationService::new(config, Arc::new(MemoryConfigStore::new()), senders)
}

#[tokio::test]
async fn test_unreachable_endpoint_does_not_stop_the_others() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/a"))
        .and(header("x-team", "sre"))
        .and(body_partial_json(serde_json::json!({
            "severity": "critical",
            "source": "devops-monitor",
            "metadata": { "service": "checkout" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut first = WebhookEndpoint::new(format!("{}/a", server.uri()));
    first.name = Some("pager".to_string());
    first.headers = BTreeMap::from([("X-Team".to_string(), "sre".to_string())]);
    let mut unreachable = WebhookEndpoint::new("http://127.0.0.1:1/down");
    unreachable.timeout_ms = Some(500);
    let third = WebhookEndpoint::new(format!("{}/c", server.uri()));

    let mut config = NotificationsConfig::default();
    config.channels.webhook.enabled = true;
    config.channels.webhook.endpoints = vec![first, unreachable, third];
    let service = http_service(config);

    let request = SendRequest::new("webhook", Message::new("Checkout down", "5xx rate at 40%"))
        .with_severity(Severity::Critical)
        .with_metadata(Metadata {
            service: Some("checkout".to_string()),
            ..Default::default()
        });
    let outcomes = service.send(request).await.unwrap();

    assert_eq!(outcomes.len(), 1);
    let webhook = &outcomes[0];
    assert_eq!(webhook.channel, ChannelKind::Webhook);
    assert!(webhook.success);

    let endpoints: Vec<EndpointOutcome> =
        serde_json::from_value(webhook.result.clone().unwrap()).unwrap();
    assert_eq!(endpoints.len(), 3);
    assert_eq!(endpoints.iter().filter(|e| e.success).count(), 2);

    assert_eq!(endpoints[0].name, "pager");
    assert!(endpoints[0].success);
    assert!(!endpoints[1].success);
    assert!(endpoints[1].error.is_some());
    assert_eq!(endpoints[2].status, Some(204));
}

#[tokio::test]
async fn test_no_endpoints_yields_empty_result_list() {
    let mut config = NotificationsConfig::default();
    config.channels.webhook.enabled = true;
    let service = http_service(config);

    let outcomes = service.test("webhook").await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[0].result, Some(serde_json::json!([])));
}

#[tokio::test]
async fn test_chat_rejection_is_reported_as_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/slack"))
        .respond_with(ResponseTemplate::new(403).set_body_string("invalid_token"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/discord"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let mut config = NotificationsConfig::default();
    config.channels.slack.enabled = true;
    config.channels.slack.webhook_url = format!("{}/slack", server.uri());
    config.channels.discord.enabled = true;
    config.channels.discord.webhook_url = format!("{}/discord", server.uri());
    let service = http_service(config);

    let outcomes = service.test("all").await.unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].channel, ChannelKind::Slack);
    assert!(!outcomes[0].success);
    assert!(outcomes[0].error.as_deref().unwrap().contains("invalid_token"));
    assert_eq!(outcomes[1].channel, ChannelKind::Discord);
    assert!(outcomes[1].success);
}
