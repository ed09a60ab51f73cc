//! alertrelay - relays alerts and notifications to chat, email and webhook
//! channels.
//!
//! A notification comes in either directly (`NotificationService::send`) or
//! as part of an Alertmanager webhook batch, is formatted for every enabled
//! channel, and is delivered to all of them concurrently.

pub mod alerts;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod formatting;
pub mod internal_metrics;
pub mod notification;
pub mod server;
pub mod service;
pub mod store;

pub use crate::core::*;
pub use crate::service::{NotificationService, SendRequest};
