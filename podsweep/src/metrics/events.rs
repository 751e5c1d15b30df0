//! Per-pod event counters.

use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};

use crate::metrics::{
    labels,
    partial_match::VecHandle,
    registry::{MetricsSubsystem, register_collectors},
};

/// Kind of observed process event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ProcessExec,
    ProcessExit,
    ProcessKprobe,
    ProcessTracepoint,
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        match self {
            EventType::ProcessExec => "process_exec",
            EventType::ProcessExit => "process_exit",
            EventType::ProcessKprobe => "process_kprobe",
            EventType::ProcessTracepoint => "process_tracepoint",
        }
    }
}

pub struct EventMetrics {
    /// Labels: type, namespace, pod, binary
    pub events_total: IntCounterVec,
}

impl EventMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            events_total: IntCounterVec::new(
                Opts::new("events_total", "The total number of events observed per pod")
                    .namespace("podsweep"),
                &[
                    labels::EVENT_TYPE,
                    labels::NAMESPACE,
                    labels::POD,
                    labels::BINARY,
                ],
            )?,
        })
    }

    /// Increment the events counter for a pod.
    ///
    /// Hook for event producers linked against this crate; the binary itself
    /// records no events, it only exposes and cleans up their series.
    pub fn inc_event(&self, event_type: EventType, namespace: &str, pod: &str, binary: &str) {
        self.events_total
            .with_label_values(&[event_type.as_ref(), namespace, pod, binary])
            .inc();
    }
}

impl MetricsSubsystem for EventMetrics {
    fn name(&self) -> &'static str {
        "events"
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        register_collectors!(registry, self.events_total);
        Ok(())
    }

    fn pod_labeled_vecs(&self) -> Vec<VecHandle> {
        vec![Arc::new(self.events_total.clone())]
    }
}
