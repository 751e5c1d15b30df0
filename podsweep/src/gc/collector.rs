use std::{sync::Arc, time::Duration};

use tracing::{debug, trace};

use crate::{
    gc::{deleter::delete_metrics_for_pod, identity::PodIdentity, queue::DelayingQueue},
    k8s::{DeleteNotification, PodDeleteHandler},
    metrics::{PodLabeledRegistry, labels, pod_gc::PodGcMetrics},
};

/// Removes the metric series of deleted pods after a fixed delay.
///
/// Owns the eviction queue and the pod-labeled vector set. Delete
/// notifications enter through [`PodDeleteHandler::on_delete`]; the series
/// are removed by the eviction worker (see [`run_eviction_worker`]).
///
/// [`run_eviction_worker`]: PodMetricsGc::run_eviction_worker
pub struct PodMetricsGc {
    pub(crate) queue: DelayingQueue<PodIdentity>,
    pub(crate) registry: Arc<PodLabeledRegistry>,
    pub(crate) metrics: Arc<PodGcMetrics>,
    delete_delay: Duration,
}

impl PodMetricsGc {
    pub fn new(
        registry: Arc<PodLabeledRegistry>,
        metrics: Arc<PodGcMetrics>,
        delete_delay: Duration,
    ) -> Self {
        Self {
            queue: DelayingQueue::new(),
            registry,
            metrics,
            delete_delay,
        }
    }

    pub fn delete_delay(&self) -> Duration {
        self.delete_delay
    }

    /// Number of pods waiting for cleanup.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Schedules cleanup of `pod`'s series once the delete delay has elapsed.
    pub fn schedule(&self, pod: PodIdentity) {
        debug!(
            event.name = "pod_gc.scheduled",
            k8s.pod.name = %pod.name,
            k8s.namespace.name = %pod.namespace,
            delay_seconds = self.delete_delay.as_secs(),
            "scheduled metric cleanup for deleted pod"
        );
        self.queue.add_after(pod, self.delete_delay);
        self.metrics.enqueued_total.inc();
        self.metrics.queue_depth.set(self.queue.len() as i64);
    }

    /// Removes `pod`'s series now, returning how many were removed.
    pub fn delete_metrics_for_pod(&self, pod: &PodIdentity) -> usize {
        let removed = delete_metrics_for_pod(&self.registry, pod);
        self.metrics.evictions_total.inc();
        self.metrics.series_deleted_total.inc_by(removed as u64);
        removed
    }

    fn ignore(&self, reason: &str) {
        trace!(
            event.name = "pod_gc.notification_ignored",
            reason,
            "ignoring pod delete notification"
        );
        self.metrics
            .ignored_notifications_total
            .with_label_values(&[reason])
            .inc();
    }
}

impl PodDeleteHandler for PodMetricsGc {
    fn on_delete(&self, notification: DeleteNotification) {
        let pod = match notification {
            DeleteNotification::Pod(pod) => *pod,
            DeleteNotification::DeletedFinalStateUnknown { key, obj: Some(pod) } => {
                debug!(
                    event.name = "pod_gc.tombstone_recovered",
                    k8s.object.key = %key,
                    "recovered pod from missed deletion"
                );
                *pod
            }
            DeleteNotification::DeletedFinalStateUnknown { obj: None, .. } => {
                return self.ignore(labels::IGNORED_EMPTY_TOMBSTONE);
            }
            DeleteNotification::Unrecognized { .. } => {
                return self.ignore(labels::IGNORED_UNRECOGNIZED);
            }
        };

        match PodIdentity::from_pod(&pod) {
            Some(identity) => self.schedule(identity),
            None => self.ignore(labels::IGNORED_MISSING_IDENTITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::ObjectMeta};

    use super::*;

    fn gc() -> PodMetricsGc {
        PodMetricsGc::new(
            Arc::new(PodLabeledRegistry::new(Vec::new())),
            Arc::new(PodGcMetrics::new().unwrap()),
            Duration::from_secs(60),
        )
    }

    fn pod(name: &str, namespace: &str) -> Box<Pod> {
        Box::new(Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn ignored(gc: &PodMetricsGc, reason: &str) -> u64 {
        gc.metrics
            .ignored_notifications_total
            .with_label_values(&[reason])
            .get()
    }

    #[tokio::test]
    async fn test_pod_notification_is_scheduled() {
        let gc = gc();
        gc.on_delete(DeleteNotification::Pod(pod("web-1", "default")));

        assert_eq!(gc.pending(), 1);
        assert_eq!(gc.metrics.enqueued_total.get(), 1);
        assert_eq!(gc.metrics.queue_depth.get(), 1);
    }

    #[tokio::test]
    async fn test_tombstone_with_pod_is_scheduled() {
        let gc = gc();
        gc.on_delete(DeleteNotification::DeletedFinalStateUnknown {
            key: "default/web-1".to_string(),
            obj: Some(pod("web-1", "default")),
        });

        assert_eq!(gc.pending(), 1);
    }

    #[tokio::test]
    async fn test_empty_tombstone_is_ignored() {
        let gc = gc();
        gc.on_delete(DeleteNotification::DeletedFinalStateUnknown {
            key: "default/web-1".to_string(),
            obj: None,
        });

        assert_eq!(gc.pending(), 0);
        assert_eq!(ignored(&gc, labels::IGNORED_EMPTY_TOMBSTONE), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_payload_is_ignored() {
        let gc = gc();
        gc.on_delete(DeleteNotification::Unrecognized {
            kind: "Node".to_string(),
        });

        assert_eq!(gc.pending(), 0);
        assert_eq!(ignored(&gc, labels::IGNORED_UNRECOGNIZED), 1);
    }

    #[tokio::test]
    async fn test_pod_without_namespace_is_ignored() {
        let gc = gc();
        let mut nameless = pod("web-1", "default");
        nameless.metadata.namespace = None;
        gc.on_delete(DeleteNotification::Pod(nameless));

        assert_eq!(gc.pending(), 0);
        assert_eq!(ignored(&gc, labels::IGNORED_MISSING_IDENTITY), 1);
    }

    #[tokio::test]
    async fn test_repeated_delete_is_deduplicated() {
        let gc = gc();
        gc.on_delete(DeleteNotification::Pod(pod("web-1", "default")));
        gc.on_delete(DeleteNotification::Pod(pod("web-1", "default")));
        gc.on_delete(DeleteNotification::Pod(pod("web-1", "other")));

        assert_eq!(gc.pending(), 2);
    }

    #[tokio::test]
    async fn test_oversized_delete_delay_still_schedules() {
        let gc = PodMetricsGc::new(
            Arc::new(PodLabeledRegistry::new(Vec::new())),
            Arc::new(PodGcMetrics::new().unwrap()),
            Duration::MAX,
        );
        gc.on_delete(DeleteNotification::Pod(pod("web-1", "default")));

        assert_eq!(gc.pending(), 1);
        assert_eq!(gc.metrics.enqueued_total.get(), 1);
    }
}
