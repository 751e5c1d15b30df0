use std::{sync::Arc, time::Duration};

use axum::{body::Body, http::Request};
use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::ObjectMeta};
use podsweep::{
    gc::PodMetricsGc,
    k8s::{DeleteNotification, PodDeleteHandler},
    metrics::{
        MetricsSubsystem, PodLabeledRegistry, VecHandle, pod_gc::PodGcMetrics,
        registry::init_all_metrics, server::create_metrics_router,
    },
};
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};
use tokio::{sync::broadcast, task::JoinHandle, time};
use tower::ServiceExt;

const DELETE_DELAY: Duration = Duration::from_secs(60);

struct RequestMetrics {
    request_count: IntCounterVec,
}

impl MetricsSubsystem for RequestMetrics {
    fn name(&self) -> &'static str {
        "requests"
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.request_count.clone()))
    }

    fn pod_labeled_vecs(&self) -> Vec<VecHandle> {
        vec![Arc::new(self.request_count.clone())]
    }
}

struct Harness {
    registry: Registry,
    request_count: IntCounterVec,
    gc: Arc<PodMetricsGc>,
    shutdown_tx: broadcast::Sender<()>,
    worker: JoinHandle<()>,
}

impl Harness {
    fn start() -> Self {
        let registry = Registry::new();
        let requests = Arc::new(RequestMetrics {
            request_count: IntCounterVec::new(
                Opts::new("request_count", "Requests served"),
                &["pod", "namespace", "code"],
            )
            .unwrap(),
        });
        let gc_metrics = Arc::new(PodGcMetrics::new().unwrap());
        let subsystems: [Arc<dyn MetricsSubsystem>; 2] = [requests.clone(), gc_metrics.clone()];
        init_all_metrics(&registry, &subsystems).unwrap();

        let gc = Arc::new(PodMetricsGc::new(
            Arc::new(PodLabeledRegistry::new(vec![requests.clone()])),
            gc_metrics,
            DELETE_DELAY,
        ));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let worker = {
            let gc = gc.clone();
            tokio::spawn(async move { gc.run_eviction_worker(shutdown_rx).await })
        };

        Self {
            registry,
            request_count: requests.request_count.clone(),
            gc,
            shutdown_tx,
            worker,
        }
    }

    fn exposition(&self) -> String {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .unwrap()
    }

    async fn scrape(&self) -> String {
        let response = create_metrics_router(self.registry.clone())
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }

    async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        time::timeout(Duration::from_millis(100), self.worker)
            .await
            .expect("worker should stop promptly")
            .expect("worker should not panic");
    }
}

fn pod(name: &str, namespace: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn deleted_pod_series_leave_the_scrape_after_the_delay() {
    let harness = Harness::start();
    harness
        .request_count
        .with_label_values(&["web-1", "default", "200"])
        .inc();
    harness
        .request_count
        .with_label_values(&["web-1", "default", "500"])
        .inc();
    harness
        .request_count
        .with_label_values(&["web-2", "default", "200"])
        .inc();

    harness
        .gc
        .on_delete(DeleteNotification::Pod(Box::new(pod("web-1", "default"))));
    assert_eq!(harness.gc.pending(), 1);

    time::sleep(Duration::from_secs(30)).await;
    let text = harness.exposition();
    assert!(text.contains(r#"request_count{code="200",namespace="default",pod="web-1"} 1"#));
    assert!(text.contains(r#"request_count{code="500",namespace="default",pod="web-1"} 1"#));

    time::sleep(Duration::from_secs(31)).await;
    let text = harness.scrape().await;
    assert!(!text.contains(r#"pod="web-1""#), "web-1 still exposed:\n{text}");
    assert!(text.contains(r#"request_count{code="200",namespace="default",pod="web-2"} 1"#));
    assert!(text.contains("podsweep_pod_gc_evictions_total 1"));
    assert!(text.contains("podsweep_pod_gc_series_deleted_total 2"));
    assert_eq!(harness.gc.pending(), 0);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn tombstone_without_object_is_ignored() {
    let harness = Harness::start();
    harness
        .request_count
        .with_label_values(&["web-1", "default", "200"])
        .inc();

    harness.gc.on_delete(DeleteNotification::DeletedFinalStateUnknown {
        key: "default/web-1".to_string(),
        obj: None,
    });
    assert_eq!(harness.gc.pending(), 0);

    time::sleep(DELETE_DELAY * 2).await;
    let text = harness.exposition();
    assert!(text.contains(r#"pod="web-1""#));
    assert!(text.contains(
        r#"podsweep_pod_gc_ignored_notifications_total{reason="empty_tombstone"} 1"#
    ));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn tombstone_with_last_known_state_is_cleaned_up() {
    let harness = Harness::start();
    harness
        .request_count
        .with_label_values(&["db-0", "storage", "200"])
        .inc();

    harness.gc.on_delete(DeleteNotification::DeletedFinalStateUnknown {
        key: "storage/db-0".to_string(),
        obj: Some(Box::new(pod("db-0", "storage"))),
    });

    time::sleep(DELETE_DELAY + Duration::from_secs(1)).await;
    assert!(!harness.exposition().contains(r#"pod="db-0""#));

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_pending_entry_leaves_series_in_place() {
    let harness = Harness::start();
    harness
        .request_count
        .with_label_values(&["web-1", "default", "200"])
        .inc();

    harness
        .gc
        .on_delete(DeleteNotification::Pod(Box::new(pod("web-1", "default"))));
    time::sleep(Duration::from_secs(10)).await;

    let registry = harness.registry.clone();
    harness.stop().await;

    time::sleep(DELETE_DELAY * 2).await;
    let text = TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap();
    assert!(text.contains(r#"request_count{code="200",namespace="default",pod="web-1"} 1"#));
    assert!(text.contains("podsweep_pod_gc_evictions_total 0"));
}
