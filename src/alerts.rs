//! Alertmanager webhook adaptation.
//!
//! An Alertmanager webhook delivers a group of alerts at once. Each alert is
//! turned into its own `Notification` and dispatched on its own.

use crate::core::{Message, Metadata, Notification, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An Alertmanager webhook payload. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertBatch {
    pub version: Option<String>,
    pub group_key: Option<String>,
    pub status: Option<String>,
    pub receiver: Option<String>,
    pub group_labels: BTreeMap<String, String>,
    pub common_labels: BTreeMap<String, String>,
    pub common_annotations: BTreeMap<String, String>,
    #[serde(rename = "externalURL")]
    pub external_url: Option<String>,
    pub alerts: Vec<Alert>,
}

/// One firing or resolved alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Alert {
    pub status: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    #[serde(rename = "generatorURL")]
    pub generator_url: Option<String>,
    pub fingerprint: Option<String>,
}

impl Alert {
    fn label(&self, key: &str) -> Option<&str> {
        non_empty(self.labels.get(key))
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        non_empty(self.annotations.get(key))
    }

    fn is_resolved(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("resolved"))
    }

    /// Normalizes the alert.
    ///
    /// - title: `summary` annotation, else `alertname` label, else "Alert"
    /// - body: `description` annotation, else empty
    /// - severity: `severity` label; a resolved alert without one is `Resolved`,
    ///   anything else without one is `Info`
    pub fn to_notification(&self) -> Notification {
        let title = self
            .annotation("summary")
            .or_else(|| self.label("alertname"))
            .unwrap_or("Alert");
        let body = self.annotation("description").unwrap_or_default();

        let severity = match self.label("severity") {
            Some(label) => Severity::from(label),
            None if self.is_resolved() => Severity::Resolved,
            None => Severity::Info,
        };

        let metadata = Metadata {
            instance: self.label("instance").map(String::from),
            service: self.label("service").map(String::from),
            component: self.label("component").map(String::from),
            runbook_url: self.annotation("runbook_url").map(String::from),
            status: self.status.clone().filter(|s| !s.is_empty()),
            ..Default::default()
        };

        Notification::new(Message::new(title, body), severity, metadata)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

/// Converts every alert of the batch, preserving order.
pub fn adapt(batch: &AlertBatch) -> Vec<Notification> {
    batch.alerts.iter().map(Alert::to_notification).collect()
}
