//! Prometheus metrics HTTP server.
//!
//! Exposes the shared registry at `/metrics` in the Prometheus text format.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use podsweep::metrics::{Metrics, server};
//!
//! let metrics = Metrics::new()?;
//! tokio::spawn(server::start_metrics_server(conf.metrics, metrics.registry.clone(), shutdown_rx));
//! ```

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use prometheus::Registry;
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::metrics::{error::MetricsError, opts::MetricsOptions};

/// Handler for the `/metrics` endpoint.
///
/// Returns Prometheus text format metrics for all registered collectors.
async fn metrics_handler(State(registry): State<Registry>) -> impl IntoResponse {
    match tokio::task::spawn_blocking(move || {
        let encoder = prometheus::TextEncoder::new();
        let metric_families = registry.gather();
        encoder.encode_to_string(&metric_families)
    })
    .await
    {
        Ok(Ok(body)) => (StatusCode::OK, body),
        Ok(Err(e)) => {
            tracing::error!(
                event.name = "metrics.encode_failed",
                error.message = %e,
                "failed to encode metrics"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
        }
        Err(e) => {
            tracing::error!(
                event.name = "metrics.gather_failed",
                error.message = %e,
                "metrics gathering task panicked"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to gather metrics".to_string(),
            )
        }
    }
}

/// Create the metrics HTTP router.
pub fn create_metrics_router(registry: Registry) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Start the Prometheus metrics HTTP server.
///
/// Serves metrics at `<listen_address>:<port>/metrics` until a shutdown
/// signal is received.
///
/// ### Returns
///
/// Returns `Ok(())` on shutdown or when disabled, or `MetricsError` if the
/// listener cannot be bound.
pub async fn start_metrics_server(
    config: MetricsOptions,
    registry: Registry,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), MetricsError> {
    if !config.enabled {
        info!(
            event.name = "metrics.disabled",
            "metrics server is disabled in configuration"
        );
        return Ok(());
    }

    let app = create_metrics_router(registry);

    let bind_address = format!("{}:{}", config.listen_address, config.port);
    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|e| MetricsError::bind_address(&bind_address, e))?;

    info!(
        event.name = "metrics.started",
        net.listen.address = %bind_address,
        "metrics server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(MetricsError::ServeError)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use prometheus::{IntCounterVec, Opts};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn test_metrics_endpoint_serves_text_format() {
        let registry = Registry::new();
        let vec = IntCounterVec::new(Opts::new("request_count", "Requests"), &["pod", "namespace"])
            .unwrap();
        registry.register(Box::new(vec.clone())).unwrap();
        vec.with_label_values(&["web-1", "default"]).inc();

        let response = create_metrics_router(registry)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains(r#"request_count{namespace="default",pod="web-1"} 1"#));
    }

    #[tokio::test]
    async fn test_disabled_server_returns_immediately() {
        let (_tx, rx) = broadcast::channel(1);
        let config = MetricsOptions {
            enabled: false,
            ..Default::default()
        };
        start_metrics_server(config, Registry::new(), rx)
            .await
            .expect("disabled server should return Ok");
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let (_tx, rx) = broadcast::channel(1);
        let config = MetricsOptions {
            enabled: true,
            listen_address: "127.0.0.1".to_string(),
            port: taken.local_addr().unwrap().port(),
        };
        let err = start_metrics_server(config, Registry::new(), rx)
            .await
            .expect_err("invalid address should fail to bind");
        assert!(err.to_string().contains("failed to bind metrics server"));
    }
}
