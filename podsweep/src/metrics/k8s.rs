//! Kubernetes pod watcher metrics.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

use crate::metrics::registry::{MetricsSubsystem, register_collectors};

/// K8s watcher event types for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum K8sWatcherEventType {
    Apply,
    Delete,
    Init,
    InitDone,
    Error,
}

impl AsRef<str> for K8sWatcherEventType {
    fn as_ref(&self) -> &str {
        match self {
            K8sWatcherEventType::Apply => "apply",
            K8sWatcherEventType::Delete => "delete",
            K8sWatcherEventType::Init => "init",
            K8sWatcherEventType::InitDone => "init_done",
            K8sWatcherEventType::Error => "error",
        }
    }
}

pub struct K8sWatcherMetrics {
    /// Labels: event = "apply" | "delete" | "init" | "init_done" | "error"
    pub events_total: IntCounterVec,
    /// Deletions recovered from a re-list because the watch missed them.
    pub missed_deletes_total: IntCounter,
}

impl K8sWatcherMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            events_total: IntCounterVec::new(
                Opts::new("events_total", "Total number of pod watcher events")
                    .namespace("podsweep")
                    .subsystem("k8s_watcher"),
                &["event"],
            )?,
            missed_deletes_total: IntCounter::with_opts(
                Opts::new(
                    "missed_deletes_total",
                    "Pod deletions recovered from a re-list after the watch missed them",
                )
                .namespace("podsweep")
                .subsystem("k8s_watcher"),
            )?,
        })
    }

    /// Increment the K8s watcher events counter.
    pub fn inc_event(&self, event: K8sWatcherEventType) {
        self.events_total.with_label_values(&[event.as_ref()]).inc();
    }
}

impl MetricsSubsystem for K8sWatcherMetrics {
    fn name(&self) -> &'static str {
        "k8s_watcher"
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        register_collectors!(registry, self.events_total, self.missed_deletes_total);
        Ok(())
    }
}
