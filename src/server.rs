//! # API Server
//!
//! The `axum` router exposing the notification service over HTTP, and the
//! `ApiServer` that runs it until the shutdown signal fires.
//!
//! | Route                                   | Operation                  |
//! |-----------------------------------------|----------------------------|
//! | `POST /api/notifications/send`          | `send`                     |
//! | `POST /api/notifications/test/{channel}`| `test`                     |
//! | `POST /api/webhooks/alertmanager`       | `process_alert_batch`      |
//! | `GET  /api/notifications/config`        | `get_config`               |
//! | `PUT  /api/notifications/config`        | `set_config`               |
//! | `GET  /health`                          | liveness                   |
//! | `GET  /metrics`                         | Prometheus exposition      |

use crate::alerts::AlertBatch;
use crate::error::NotifyError;
use crate::service::{NotificationService, SendRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, trace};

#[derive(Clone)]
struct AppState {
    service: Arc<NotificationService>,
    prom_handle: Option<PrometheusHandle>,
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": self.to_string() })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for NotifyError {
    fn from(rejection: JsonRejection) -> Self {
        NotifyError::InvalidBody(rejection.body_text())
    }
}

/// Builds the API router.
///
/// `/metrics` answers 404 when no Prometheus recorder is installed.
pub fn router(service: Arc<NotificationService>, prom_handle: Option<PrometheusHandle>) -> Router {
    let state = AppState {
        service,
        prom_handle,
    };

    Router::new()
        .route("/api/notifications/send", post(send))
        .route("/api/notifications/test/{channel}", post(test_channel))
        .route("/api/webhooks/alertmanager", post(alertmanager))
        .route("/api/notifications/config", get(get_config).put(set_config))
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .with_state(state)
}

async fn send(
    State(state): State<AppState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<Value>, NotifyError> {
    let Json(request) = body?;
    let results = state.service.send(request).await?;
    Ok(Json(json!({ "success": true, "results": results })))
}

async fn test_channel(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Json<Value>, NotifyError> {
    let results = state.service.test(&channel).await?;
    Ok(Json(json!({ "success": true, "results": results })))
}

async fn alertmanager(
    State(state): State<AppState>,
    body: Result<Json<AlertBatch>, JsonRejection>,
) -> Result<Json<Value>, NotifyError> {
    let Json(batch) = body?;
    let results = state.service.process_alert_batch(&batch).await;
    Ok(Json(json!({
        "success": true,
        "processed": results.len(),
        "results": results,
    })))
}

async fn get_config(State(state): State<AppState>) -> Json<Value> {
    Json(json!(*state.service.get_config()))
}

async fn set_config(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, NotifyError> {
    let Json(patch) = body?;
    let config = state.service.set_config(&patch).await?;
    Ok(Json(json!({ "success": true, "config": *config })))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.prom_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics are disabled").into_response(),
    }
}

/// Serves the API until the shutdown signal fires.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
    shutdown_rx: watch::Receiver<bool>,
}

impl ApiServer {
    /// Creates a server on an already bound listener. Nothing runs until `run`.
    pub fn new(listener: TcpListener, router: Router, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            listener,
            router,
            shutdown_rx,
        }
    }

    /// Serves requests; in-flight requests finish before this returns.
    pub async fn run(self) {
        let mut shutdown_rx = self.shutdown_rx;
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "API server listening");
        }

        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                // A dropped sender counts as a shutdown too.
                let _ = shutdown_rx.changed().await;
                trace!("API server received shutdown signal");
            })
            .await;

        if let Err(e) = result {
            error!(error = %e, "API server error");
        }
        trace!("API server task finished");
    }
}
