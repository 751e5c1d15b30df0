//! Metric subsystems, the shared registry and the pod-labeled vector set.
//!
//! Each subsystem owns its collectors and registers them into the shared
//! [`Registry`] once at startup. Subsystems whose vectors carry `pod` and
//! `namespace` labels also report them, so the pod metric GC can remove the
//! series of deleted pods.

use std::sync::{Arc, OnceLock};

use prometheus::Registry;
use tracing::{debug, warn};

use crate::metrics::{
    error::MetricsError,
    events::EventMetrics,
    k8s::K8sWatcherMetrics,
    labels,
    partial_match::VecHandle,
    pod_gc::PodGcMetrics,
    syscalls::SyscallMetrics,
};

// Helper macro to register a list of collectors into a registry
macro_rules! register_collectors {
    ($registry:expr, $($metric:expr),+ $(,)?) => {{
        $( $registry.register(Box::new($metric.clone()))?; )+
    }};
}

pub(crate) use register_collectors;

/// A group of metrics owned by one part of the agent.
pub trait MetricsSubsystem: Send + Sync {
    /// Subsystem name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Attaches the subsystem's collectors to `registry`.
    fn register(&self, registry: &Registry) -> Result<(), prometheus::Error>;

    /// Vectors owned by this subsystem that carry `pod` and `namespace` labels.
    fn pod_labeled_vecs(&self) -> Vec<VecHandle> {
        Vec::new()
    }
}

/// Registers every subsystem into `registry`, in order.
pub fn init_all_metrics(
    registry: &Registry,
    subsystems: &[Arc<dyn MetricsSubsystem>],
) -> Result<(), MetricsError> {
    for subsystem in subsystems {
        subsystem
            .register(registry)
            .map_err(|e| MetricsError::registration(subsystem.name(), e))?;
        debug!(
            event.name = "metrics.subsystem_registered",
            metrics.subsystem = subsystem.name(),
            "registered metric subsystem"
        );
    }
    Ok(())
}

/// Build-once set of metric vectors labeled with pod identity.
///
/// The set is assembled on the first call to [`list_pod_labeled_vecs`] by
/// asking each subsystem, in the order given to [`new`], for its pod-labeled
/// vectors. Concurrent first callers wait for a single build; every later
/// call reads the cached set without locking.
///
/// [`list_pod_labeled_vecs`]: PodLabeledRegistry::list_pod_labeled_vecs
/// [`new`]: PodLabeledRegistry::new
pub struct PodLabeledRegistry {
    subsystems: Vec<Arc<dyn MetricsSubsystem>>,
    vecs: OnceLock<Vec<VecHandle>>,
}

impl PodLabeledRegistry {
    pub fn new(subsystems: Vec<Arc<dyn MetricsSubsystem>>) -> Self {
        Self {
            subsystems,
            vecs: OnceLock::new(),
        }
    }

    /// Returns the pod-labeled vectors, building the set on first use.
    pub fn list_pod_labeled_vecs(&self) -> &[VecHandle] {
        self.vecs.get_or_init(|| self.build())
    }

    /// Whether the set has been built yet.
    pub fn is_built(&self) -> bool {
        self.vecs.get().is_some()
    }

    fn build(&self) -> Vec<VecHandle> {
        let mut vecs = Vec::new();
        for subsystem in &self.subsystems {
            for vec in subsystem.pod_labeled_vecs() {
                let label_names = vec.label_names();
                let has_identity = [labels::POD, labels::NAMESPACE]
                    .iter()
                    .all(|required| label_names.iter().any(|l| l == required));
                if !has_identity {
                    warn!(
                        event.name = "metrics.pod_labeled.rejected",
                        metrics.subsystem = subsystem.name(),
                        metric.name = %vec.name(),
                        metric.labels = ?label_names,
                        "vector lacks pod/namespace labels, pod metric cleanup will skip it"
                    );
                    continue;
                }
                vecs.push(vec);
            }
        }

        debug!(
            event.name = "metrics.pod_labeled.built",
            vector_count = vecs.len(),
            "built pod-labeled metric set"
        );
        vecs
    }
}

/// Metric subsystems of the agent, registered into one shared registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub events: Arc<EventMetrics>,
    pub syscalls: Arc<SyscallMetrics>,
    pub k8s_watcher: Arc<K8sWatcherMetrics>,
    pub pod_gc: Arc<PodGcMetrics>,
}

impl Metrics {
    /// Creates every subsystem and registers it into a fresh registry.
    pub fn new() -> Result<Self, MetricsError> {
        let metrics = Self {
            registry: Registry::new(),
            events: Arc::new(EventMetrics::new()?),
            syscalls: Arc::new(SyscallMetrics::new()?),
            k8s_watcher: Arc::new(K8sWatcherMetrics::new()?),
            pod_gc: Arc::new(PodGcMetrics::new()?),
        };
        init_all_metrics(&metrics.registry, &metrics.subsystems())?;
        Ok(metrics)
    }

    /// All subsystems, in registration order.
    pub fn subsystems(&self) -> Vec<Arc<dyn MetricsSubsystem>> {
        vec![
            self.events.clone(),
            self.syscalls.clone(),
            self.k8s_watcher.clone(),
            self.pod_gc.clone(),
        ]
    }

    /// Subsystems contributing pod-labeled vectors, in their fixed order.
    pub fn pod_labeled_subsystems(&self) -> Vec<Arc<dyn MetricsSubsystem>> {
        vec![self.events.clone(), self.syscalls.clone()]
    }
}
