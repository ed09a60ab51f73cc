#![allow(dead_code)]
use alertrelay::core::{ChannelPayload, ChannelSender};
use alertrelay::error::ChannelError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// A sender that records every payload it is handed.
///
/// Posts to a URL in `failing_urls` fail; a non-zero `delay` makes every
/// delivery sleep first.
#[derive(Default)]
pub struct FakeSender {
    delivered: Mutex<Vec<ChannelPayload>>,
    failing_urls: Vec<String>,
    delay: Duration,
}

impl FakeSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(url: impl Into<String>) -> Self {
        Self {
            failing_urls: vec![url.into()],
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delivered(&self) -> Vec<ChannelPayload> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelSender for FakeSender {
    async fn deliver(&self, payload: &ChannelPayload) -> Result<Value, ChannelError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let ChannelPayload::Post { url, .. } = payload {
            if self.failing_urls.contains(url) {
                return Err(ChannelError::NotConfigured(format!("{url} is down")));
            }
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(json!({ "status": 200 }))
    }
}
