//! Per-pod syscall counters.

use std::sync::Arc;

use prometheus::{IntCounterVec, Opts, Registry};

use crate::metrics::{
    labels,
    partial_match::VecHandle,
    registry::{MetricsSubsystem, register_collectors},
};

pub struct SyscallMetrics {
    /// Labels: syscall, namespace, pod, binary
    pub syscalls_total: IntCounterVec,
}

impl SyscallMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        Ok(Self {
            syscalls_total: IntCounterVec::new(
                Opts::new("syscalls_total", "The total number of syscalls observed per pod")
                    .namespace("podsweep"),
                &[labels::SYSCALL, labels::NAMESPACE, labels::POD, labels::BINARY],
            )?,
        })
    }

    /// Hook for syscall producers linked against this crate; the binary itself
    /// records no syscalls.
    pub fn inc_syscall(&self, syscall: &str, namespace: &str, pod: &str, binary: &str) {
        self.syscalls_total
            .with_label_values(&[syscall, namespace, pod, binary])
            .inc();
    }
}

impl MetricsSubsystem for SyscallMetrics {
    fn name(&self) -> &'static str {
        "syscalls"
    }

    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        register_collectors!(registry, self.syscalls_total);
        Ok(())
    }

    fn pod_labeled_vecs(&self) -> Vec<VecHandle> {
        vec![Arc::new(self.syscalls_total.clone())]
    }
}
