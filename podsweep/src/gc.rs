//! Pod-scoped metric garbage collection.
//!
//! Pod delete notifications are scheduled on a [`DelayingQueue`] and, once the
//! configured delay has elapsed, a single eviction worker removes every series
//! labeled with the deleted pod from the pod-labeled metric set.
//!
//! ```text
//! informer delete -> PodMetricsGc::on_delete -> add_after(pod, delay)
//!                 -> eviction worker get() -> delete_metrics_for_pod(pod)
//! ```

pub mod collector;
pub mod deleter;
pub mod identity;
pub mod opts;
pub mod queue;
pub mod worker;

pub use collector::PodMetricsGc;
pub use deleter::delete_metrics_for_pod;
pub use identity::PodIdentity;
pub use opts::PodGcOptions;
pub use queue::DelayingQueue;
