//! Removes the Prometheus series of deleted Kubernetes pods.
//!
//! Metric subsystems register their collectors into one shared registry;
//! those labeled with `pod` and `namespace` are also handed to the pod metric
//! GC ([`gc::PodMetricsGc`]), which watches pod deletions and, after a delay,
//! deletes every series of each deleted pod.

pub mod gc;
pub mod health;
pub mod k8s;
pub mod metrics;
pub mod runtime;
