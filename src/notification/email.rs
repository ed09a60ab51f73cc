//! Email delivery over SMTP.
//!
//! The transport is built from the email settings and kept behind an
//! `ArcSwapOption`. A settings change swaps in a freshly built transport;
//! deliveries already in flight keep the transport they started with and the
//! old connection pool is released once they finish.

use crate::config::{EmailConfig, NotificationsConfig};
use crate::core::{ChannelPayload, ChannelSender, EmailContent};
use crate::error::ChannelError;
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

type Transport = AsyncSmtpTransport<Tokio1Executor>;

/// Sends rendered emails through a rebuildable SMTP transport.
pub struct SmtpSender {
    transport: ArcSwapOption<Transport>,
}

impl SmtpSender {
    /// Creates a sender and builds the initial transport.
    pub fn new(config: &EmailConfig) -> Self {
        let sender = Self {
            transport: ArcSwapOption::empty(),
        };
        sender.rebuild(config);
        sender
    }

    /// Replaces the transport with one built from `config`.
    ///
    /// If the settings cannot produce a transport, the sender is left without
    /// one and every delivery fails until the next successful rebuild.
    pub fn rebuild(&self, config: &EmailConfig) {
        match build_transport(config) {
            Ok(transport) => {
                info!(
                    host = %config.smtp.host,
                    port = config.smtp.port,
                    secure = config.smtp.secure,
                    "SMTP transport ready"
                );
                self.transport.store(Some(Arc::new(transport)));
            }
            Err(e) => {
                warn!(host = %config.smtp.host, error = %e, "Could not build SMTP transport");
                self.transport.store(None);
            }
        }
    }

    pub fn has_transport(&self) -> bool {
        self.transport.load().is_some()
    }
}

fn build_transport(config: &EmailConfig) -> Result<Transport, ChannelError> {
    let smtp = &config.smtp;
    if smtp.host.trim().is_empty() {
        return Err(ChannelError::NotConfigured("SMTP host is empty".to_string()));
    }

    // Without implicit TLS, upgrade with STARTTLS whenever the server offers it.
    let mut builder = if smtp.secure {
        Transport::relay(&smtp.host)?
    } else {
        let tls = TlsParameters::new(smtp.host.clone())?;
        Transport::builder_dangerous(&smtp.host).tls(Tls::Opportunistic(tls))
    };
    builder = builder.port(smtp.port);

    if !smtp.auth.user.is_empty() {
        builder = builder.credentials(Credentials::new(
            smtp.auth.user.clone(),
            smtp.auth.pass.clone(),
        ));
    }

    Ok(builder.build())
}

/// Builds the MIME message: one `To` header listing every recipient.
pub fn build_message(content: &EmailContent) -> Result<lettre::Message, ChannelError> {
    if content.to.is_empty() {
        return Err(ChannelError::InvalidEmail("no recipients configured".to_string()));
    }

    let from: Mailbox = content
        .from
        .parse()
        .map_err(|e| ChannelError::InvalidEmail(format!("from address {:?}: {}", content.from, e)))?;

    let mut builder = lettre::Message::builder()
        .from(from)
        .subject(content.subject.clone())
        .header(ContentType::TEXT_HTML);

    for recipient in &content.to {
        let mailbox: Mailbox = recipient
            .parse()
            .map_err(|e| ChannelError::InvalidEmail(format!("recipient {:?}: {}", recipient, e)))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(content.html.clone())
        .map_err(|e| ChannelError::InvalidEmail(e.to_string()))
}

#[async_trait]
impl ChannelSender for SmtpSender {
    #[instrument(skip_all)]
    async fn deliver(&self, payload: &ChannelPayload) -> Result<Value, ChannelError> {
        let ChannelPayload::Email(content) = payload else {
            return Err(ChannelError::NotConfigured(
                "SMTP sender only delivers email payloads".to_string(),
            ));
        };

        let transport = self
            .transport
            .load_full()
            .ok_or_else(|| ChannelError::NotConfigured("no SMTP transport".to_string()))?;

        let message = build_message(content)?;
        let recipients = content.to.join(", ");

        match transport.send(message).await {
            Ok(response) => {
                info!(to = %recipients, subject = %content.subject, "Email sent");
                let lines: Vec<String> = response.message().map(|line| line.to_string()).collect();
                Ok(json!({
                    "code": response.code().to_string(),
                    "message": lines,
                    "to": recipients,
                }))
            }
            Err(e) => {
                error!(to = %recipients, error = %e, "Failed to send email");
                Err(e.into())
            }
        }
    }

    fn reconfigure(&self, config: &NotificationsConfig) {
        self.rebuild(&config.channels.email);
    }
}
