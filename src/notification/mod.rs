//! Handles the dispatching of notifications to the configured channels.
//!
//! The `Dispatcher` decides which channels to attempt and collects their
//! outcomes; the senders in `http` and `email` perform the actual I/O behind
//! the `ChannelSender` trait, so tests can swap them for fakes.
pub mod dispatcher;
pub mod email;
pub mod http;

pub use dispatcher::{Dispatcher, Senders, SharedConfig};
pub use email::SmtpSender;
pub use http::HttpSender;
