//! Metrics of the pod metric garbage collector itself.

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

use crate::metrics::registry::{MetricsSubsystem, register_collectors};

pub struct PodGcMetrics {
    pub enqueued_total: IntCounter,
    pub evictions_total: IntCounter,
    pub series_deleted_total: IntCounter,
    pub queue_depth: IntGauge,
    /// Labels: reason = "empty_tombstone" | "unrecognized" | "missing_identity"
    pub ignored_notifications_total: IntCounterVec,
}

impl PodGcMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let opts = |name: &str, help: &str| {
            Opts::new(name, help)
                .namespace("podsweep")
                .subsystem("pod_gc")
        };

        Ok(Self {
            enqueued_total: IntCounter::with_opts(opts(
                "enqueued_total",
                "Pod delete notifications scheduled for metric cleanup",
            ))?,
            evictions_total: IntCounter::with_opts(opts(
                "evictions_total",
                "Pods whose metric series were cleaned up",
            ))?,
            series_deleted_total: IntCounter::with_opts(opts(
                "series_deleted_total",
                "Metric series removed because their pod was deleted",
            ))?,
            queue_depth: IntGauge::with_opts(opts(
                "queue_depth",
                "Pods currently waiting for metric cleanup",
            ))?,
            ignored_notifications_total: IntCounterVec::new(
                opts(
                    "ignored_notifications_total",
                    "Pod delete notifications that carried no usable pod",
                ),
                &["reason"],
            )?,
        })
    }
}

impl MetricsSubsystem for PodGcMetrics {
    fn name(&self) -> &'static str {
        "pod_gc"
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        register_collectors!(
            registry,
            self.enqueued_total,
            self.evictions_total,
            self.series_deleted_total,
            self.queue_depth,
            self.ignored_notifications_total,
        );
        Ok(())
    }
}
