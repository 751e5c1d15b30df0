use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Health API server options.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiOptions {
    pub enabled: bool,
    pub listen_address: String,
    pub port: u16,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone)]
pub struct HealthState {
    pub metrics_ready: Arc<AtomicBool>,
    pub pods_synced: Arc<AtomicBool>,
    /// When false, readiness does not wait for the pod informer.
    pub k8s_required: Arc<AtomicBool>,
}

impl HealthState {
    pub fn new(k8s_required: bool) -> Self {
        Self {
            metrics_ready: Arc::new(AtomicBool::new(false)),
            pods_synced: Arc::new(AtomicBool::new(false)),
            k8s_required: Arc::new(AtomicBool::new(k8s_required)),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new(true)
    }
}

pub async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn readiness_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let metrics_ready = state.metrics_ready.load(Ordering::Relaxed);
    let pods_synced = state.pods_synced.load(Ordering::Relaxed);
    let k8s_required = state.k8s_required.load(Ordering::Relaxed);

    let is_ready = metrics_ready && (pods_synced || !k8s_required);

    let status_code = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = Json(json!({
        "status": if is_ready { "ok" } else { "unavailable" },
        "checks": {
            "metrics_ready": metrics_ready,
            "pods_synced": pods_synced,
            "k8s_required": k8s_required
        }
    }));

    (status_code, body)
}

pub fn create_health_router(state: HealthState) -> Router {
    Router::new()
        .route("/livez", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_api_server(
    state: HealthState,
    config: ApiOptions,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    if !config.enabled {
        info!(
            event.name = "api.disabled",
            "health API server is disabled in configuration"
        );
        return Ok(());
    }

    let app = create_health_router(state);

    let bind_address = format!("{}:{}", config.listen_address, config.port);
    let listener = TcpListener::bind(&bind_address).await?;

    info!(
        event.name = "api.started",
        net.listen.address = %bind_address,
        "API server with health checks started"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;
    Ok(())
}
