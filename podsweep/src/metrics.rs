//! Prometheus metrics: per-subsystem collectors, the pod-labeled vector set
//! used by the pod metric GC, and the `/metrics` HTTP server.

pub mod error;
pub mod events;
pub mod k8s;
pub mod labels;
pub mod opts;
pub mod partial_match;
pub mod pod_gc;
pub mod registry;
pub mod server;
pub mod syscalls;

pub use error::MetricsError;
pub use partial_match::{PartialMatchDelete, VecHandle};
pub use registry::{Metrics, MetricsSubsystem, PodLabeledRegistry};
