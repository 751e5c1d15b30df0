//! Eviction worker: the single consumer of the pod GC queue.

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::gc::collector::PodMetricsGc;

impl PodMetricsGc {
    /// Runs the eviction loop until the queue is shut down.
    ///
    /// Each dequeued pod has its series removed. A shutdown signal shuts the
    /// queue down, dropping the pods still waiting; the loop then returns on
    /// the next `get()`. Should be spawned as a background task.
    pub async fn run_eviction_worker(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!(
            event.name = "pod_gc.worker.started",
            delay_seconds = self.delete_delay().as_secs(),
            "pod metric eviction worker started"
        );

        let mut shutdown_seen = false;
        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.recv(), if !shutdown_seen => {
                    shutdown_seen = true;
                    debug!(
                        event.name = "pod_gc.worker.shutdown",
                        pending_pods = self.queue.len(),
                        "shutting down pod eviction queue"
                    );
                    self.queue.shutdown();
                }
                next = self.queue.get() => {
                    let Some(pod) = next else {
                        break;
                    };
                    let removed = self.delete_metrics_for_pod(&pod);
                    self.metrics.queue_depth.set(self.queue.len() as i64);
                    debug!(
                        event.name = "pod_gc.evicted",
                        k8s.pod.name = %pod.name,
                        k8s.namespace.name = %pod.namespace,
                        series_removed = removed,
                        "removed metrics of deleted pod"
                    );
                }
            }
        }

        self.metrics.queue_depth.set(0);
        info!(
            event.name = "pod_gc.worker.stopped",
            "pod metric eviction worker stopped"
        );
    }
}
