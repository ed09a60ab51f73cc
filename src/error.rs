//! Error types shared across the relay.

use thiserror::Error;

/// Errors raised by a single channel (or webhook endpoint) delivery attempt.
///
/// These never cross the dispatcher boundary: they are converted into a
/// failed `DeliveryOutcome` or `EndpointOutcome`.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The HTTP request could not be performed (connect, timeout, TLS...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote end answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The SMTP transport rejected or failed to send the message.
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    /// The email could not be built (bad address, bad header...).
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// The channel has no usable transport or target.
    #[error("channel not configured: {0}")]
    NotConfigured(String),
}

/// Errors surfaced to callers of the notification service.
///
/// Only input validation fails a call; delivery problems are reported
/// inside the returned outcomes instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    #[error("invalid configuration update: {0}")]
    InvalidConfig(String),

    /// The request body is not valid JSON or has the wrong shape.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}
