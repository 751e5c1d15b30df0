//! Pod informer: turns a kube-rs pod watch into delete notifications.
//!
//! The watcher reports deletions it sees as [`watcher::Event::Delete`]. A
//! deletion that happens while the watch is disconnected is never reported;
//! instead, the watcher re-lists all pods after reconnecting. [`PodTracker`]
//! remembers the last known state of every pod, and when a re-list completes
//! it reports each pod that did not reappear as
//! [`DeleteNotification::DeletedFinalStateUnknown`].

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, atomic::Ordering},
    time::Duration,
};

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client, ResourceExt, runtime::watcher};
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

use crate::{
    health::HealthState,
    k8s::notification::{DeleteNotification, PodDeleteHandler},
    metrics::k8s::{K8sWatcherEventType, K8sWatcherMetrics},
};

/// Pause between a watch failure and the next connection attempt.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

fn pod_key(pod: &Pod) -> String {
    match pod.namespace() {
        Some(namespace) => format!("{namespace}/{}", pod.name_any()),
        None => pod.name_any(),
    }
}

/// Last known pods and in-progress re-list bookkeeping.
#[derive(Default)]
pub struct PodTracker {
    known: HashMap<String, Pod>,
    /// Keys seen since the current re-list started.
    relisted: Option<HashSet<String>>,
}

impl PodTracker {
    /// Number of pods currently known.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Applies one watcher event, returning the delete notifications it implies.
    pub fn handle(&mut self, event: watcher::Event<Pod>) -> Vec<DeleteNotification> {
        match event {
            watcher::Event::Apply(pod) => {
                self.known.insert(pod_key(&pod), pod);
                Vec::new()
            }
            watcher::Event::Delete(pod) => {
                self.known.remove(&pod_key(&pod));
                vec![DeleteNotification::Pod(Box::new(pod))]
            }
            watcher::Event::Init => {
                self.relisted = Some(HashSet::new());
                Vec::new()
            }
            watcher::Event::InitApply(pod) => {
                let key = pod_key(&pod);
                if let Some(relisted) = self.relisted.as_mut() {
                    relisted.insert(key.clone());
                }
                self.known.insert(key, pod);
                Vec::new()
            }
            watcher::Event::InitDone => {
                let Some(relisted) = self.relisted.take() else {
                    return Vec::new();
                };
                let vanished: Vec<String> = self
                    .known
                    .keys()
                    .filter(|key| !relisted.contains(*key))
                    .cloned()
                    .collect();
                vanished
                    .into_iter()
                    .filter_map(|key| {
                        let pod = self.known.remove(&key)?;
                        Some(DeleteNotification::DeletedFinalStateUnknown {
                            key,
                            obj: Some(Box::new(pod)),
                        })
                    })
                    .collect()
            }
        }
    }
}

fn event_type(event: &watcher::Event<Pod>) -> Option<K8sWatcherEventType> {
    match event {
        watcher::Event::Apply(_) => Some(K8sWatcherEventType::Apply),
        watcher::Event::Delete(_) => Some(K8sWatcherEventType::Delete),
        watcher::Event::Init => Some(K8sWatcherEventType::Init),
        watcher::Event::InitApply(_) => None,
        watcher::Event::InitDone => Some(K8sWatcherEventType::InitDone),
    }
}

/// Watches all pods in the cluster and hands delete notifications to
/// `handler` until a shutdown signal is received.
///
/// The watch is re-established after errors. `health.pods_synced` is set
/// once the first full list has been received.
pub async fn run_pod_informer<H>(
    client: Client,
    handler: Arc<H>,
    metrics: Arc<K8sWatcherMetrics>,
    health: HealthState,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    H: PodDeleteHandler + ?Sized,
{
    let api = Api::<Pod>::all(client);
    let mut tracker = PodTracker::default();

    loop {
        debug!(
            event.name = "k8s.informer.starting",
            k8s.resource.name = "Pod",
            "starting pod watcher"
        );
        let mut stream = watcher(api.clone(), watcher::Config::default()).boxed();

        loop {
            let event = tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!(
                        event.name = "k8s.informer.shutdown",
                        known_pods = tracker.len(),
                        "pod informer shutting down"
                    );
                    return;
                }
                event = stream.next() => event,
            };

            match event {
                Some(Ok(event)) => {
                    if let Some(kind) = event_type(&event) {
                        metrics.inc_event(kind);
                    }
                    let init_done = matches!(event, watcher::Event::InitDone);

                    for notification in tracker.handle(event) {
                        if let DeleteNotification::DeletedFinalStateUnknown { key, .. } =
                            &notification
                        {
                            metrics.missed_deletes_total.inc();
                            trace!(
                                event.name = "k8s.informer.missed_delete",
                                k8s.object.key = %key,
                                "pod vanished while the watch was disconnected"
                            );
                        }
                        handler.on_delete(notification);
                    }

                    if init_done {
                        health.pods_synced.store(true, Ordering::Relaxed);
                        debug!(
                            event.name = "k8s.informer.synced",
                            known_pods = tracker.len(),
                            "pod list complete"
                        );
                    }
                }
                Some(Err(e)) => {
                    metrics.inc_event(K8sWatcherEventType::Error);
                    error!(
                        event.name = "k8s.informer.error",
                        error.message = %e,
                        k8s.resource.name = "Pod",
                        "pod watcher error, will retry"
                    );
                    break;
                }
                None => break,
            }
        }

        warn!(
            event.name = "k8s.informer.reconnecting",
            k8s.resource.name = "Pod",
            delay_seconds = RECONNECT_DELAY.as_secs(),
            "pod watcher disconnected, reconnecting"
        );
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}
