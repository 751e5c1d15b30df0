use std::sync::{Arc, atomic::Ordering};

use podsweep::{
    gc::PodMetricsGc,
    health::{self, HealthState},
    k8s::{self, run_pod_informer},
    metrics::{Metrics, PodLabeledRegistry, server::start_metrics_server},
    runtime::{
        Runtime,
        task_manager::{ShutdownResult, TaskManager},
        telemetry,
    },
};
use tokio::signal::unix::{SignalKind, signal};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Runtime { conf, .. } = Runtime::new()?;
    telemetry::init_logger(conf.log_level)?;

    info!(
        event.name = "podsweep.starting",
        service.version = env!("CARGO_PKG_VERSION"),
        config.path = ?conf.config_path,
        "starting podsweep"
    );

    let metrics = Metrics::new()?;
    let watch_pods = conf.pod_gc.enabled && conf.k8s.enabled;
    // Before any task is spawned: a failure here leaves nothing running.
    let client = k8s::client::connect(watch_pods).await?;
    let health_state = HealthState::new(watch_pods);
    health_state.metrics_ready.store(true, Ordering::Relaxed);

    let mut tasks = TaskManager::new();

    {
        let config = conf.metrics.clone();
        let registry = metrics.registry.clone();
        tasks.spawn_with_shutdown("metrics-server", move |shutdown_rx| async move {
            if let Err(e) = start_metrics_server(config, registry, shutdown_rx).await {
                error!(
                    event.name = "metrics.server_failed",
                    error.message = %e,
                    "metrics server stopped with an error"
                );
            }
        });
    }

    {
        let config = conf.api.clone();
        let state = health_state.clone();
        tasks.spawn_with_shutdown("api-server", move |shutdown_rx| async move {
            if let Err(e) = health::start_api_server(state, config, shutdown_rx).await {
                error!(
                    event.name = "api.server_failed",
                    error.message = %e,
                    "health API server stopped with an error"
                );
            }
        });
    }

    if conf.pod_gc.enabled {
        let registry = Arc::new(PodLabeledRegistry::new(metrics.pod_labeled_subsystems()));
        let gc = Arc::new(PodMetricsGc::new(
            registry,
            metrics.pod_gc.clone(),
            conf.pod_gc.delete_delay,
        ));

        let worker = gc.clone();
        tasks.spawn_with_shutdown("pod-gc-worker", move |shutdown_rx| async move {
            worker.run_eviction_worker(shutdown_rx).await
        });

        if let Some(client) = client {
            let watcher_metrics = metrics.k8s_watcher.clone();
            let state = health_state.clone();
            tasks.spawn_with_shutdown("pod-informer", move |shutdown_rx| {
                run_pod_informer(client, gc, watcher_metrics, state, shutdown_rx)
            });
        } else {
            warn!(
                event.name = "k8s.disabled",
                "kubernetes watch is disabled, no pod deletion will be observed"
            );
        }
    } else {
        info!(
            event.name = "pod_gc.disabled",
            "pod metric cleanup is disabled in configuration"
        );
    }

    wait_for_shutdown_signal().await?;

    match tasks.shutdown_with_timeout(conf.shutdown_timeout).await {
        ShutdownResult::Graceful {
            duration,
            tasks_completed,
        } => info!(
            event.name = "podsweep.stopped",
            duration_ms = duration.as_millis(),
            tasks_completed,
            "podsweep stopped"
        ),
        ShutdownResult::ForcedCancellation {
            duration,
            tasks_cancelled,
            tasks_completed,
        } => warn!(
            event.name = "podsweep.stopped",
            duration_ms = duration.as_millis(),
            tasks_cancelled,
            tasks_completed,
            "podsweep stopped after cancelling tasks"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }
    info!(
        event.name = "podsweep.shutdown_signal",
        "shutdown signal received"
    );
    Ok(())
}
