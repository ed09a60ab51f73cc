//! alertrelay - multi-channel alert notification relay.
//!
//! Runs the HTTP API by default; `test` and `relay` perform a single dispatch
//! from the command line and print the outcomes as JSON.

use alertrelay::{
    alerts::AlertBatch,
    cli::{Cli, Command},
    config::Config,
    internal_metrics::MetricsBuilder,
    server::{self, ApiServer},
    service::NotificationService,
    store::FileConfigStore,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Layer the sources: defaults, file, environment, then CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Listen Address: {}", config.server.listen_addr);
    info!("Settings Store: {}", config.store.path.display());
    info!("Metrics Enabled: {}", config.metrics.enabled);
    info!("-------------------------------------------------------");

    let prom_handle = MetricsBuilder::new(config.metrics.clone()).build();

    let store = Arc::new(FileConfigStore::new(&config.store.path));
    let service = Arc::new(NotificationService::from_store(store).await?);

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, service, prom_handle).await,
        Command::Test { channel } => {
            let results = service.test(&channel).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Command::Relay { path } => {
            let batch = read_batch(&path).await?;
            let results = service.process_alert_batch(&batch).await;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
    }
}

async fn serve(
    config: &Config,
    service: Arc<NotificationService>,
    prom_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
) -> Result<()> {
    let listener = TcpListener::bind(config.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.server.listen_addr))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let api = ApiServer::new(listener, server::router(service, prom_handle), shutdown_rx);
    let api_task = tokio::spawn(api.run());

    info!("alertrelay initialized successfully. Waiting for notifications...");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");

    // The receiver may already be gone if the server exited on its own.
    let _ = shutdown_tx.send(true);

    if let Err(e) = api_task.await {
        error!("API server task panicked: {:?}", e);
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}

async fn read_batch(path: &Path) -> Result<AlertBatch> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?
    };
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
