//! Command-Line Interface (CLI) argument parsing.
//!
//! Arguments are parsed with `clap` at startup and then layered on top of the
//! `alertrelay.toml` file and environment variables through figment.

use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Relays alerts and notifications to chat, email and webhook channels.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address the HTTP API listens on.
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<SocketAddr>,

    /// Path of the notification settings file.
    #[arg(long, value_name = "FILE")]
    pub store: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `alertrelay=trace`.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API (the default).
    Serve,
    /// Send a test notification to one channel, or `all`.
    Test {
        #[arg(default_value = "all")]
        channel: String,
    },
    /// Dispatch an Alertmanager webhook payload read from a file (`-` for stdin).
    Relay {
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut server = Dict::new();
        if let Some(addr) = self.listen {
            server.insert("listen_addr".into(), Value::from(addr.to_string()));
        }

        let mut store = Dict::new();
        if let Some(path) = &self.store {
            store.insert("path".into(), Value::from(path.display().to_string()));
        }

        let mut dict = Dict::new();
        if !server.is_empty() {
            dict.insert("server".into(), Value::from(server));
        }
        if !store.is_empty() {
            dict.insert("store".into(), Value::from(store));
        }
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
