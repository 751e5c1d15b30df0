use tracing::trace;

use crate::{
    gc::identity::PodIdentity,
    metrics::{PodLabeledRegistry, labels},
};

/// Removes every series labeled with `pod` from the pod-labeled vector set.
///
/// Matching is partial: a series is removed when its `pod` and `namespace`
/// labels equal the pod's, whatever its other labels. Returns the number of
/// series removed; zero, including for an empty set, is not an error, and
/// repeating the call for the same pod removes nothing more.
pub fn delete_metrics_for_pod(registry: &PodLabeledRegistry, pod: &PodIdentity) -> usize {
    let matchers = [
        (labels::POD, pod.name.as_str()),
        (labels::NAMESPACE, pod.namespace.as_str()),
    ];

    registry
        .list_pod_labeled_vecs()
        .iter()
        .map(|vec| {
            let removed = vec.delete_partial_match(&matchers);
            if removed > 0 {
                trace!(
                    event.name = "pod_gc.series_removed",
                    k8s.pod.name = %pod.name,
                    k8s.namespace.name = %pod.namespace,
                    metric.name = %vec.name(),
                    removed,
                    "removed pod metric series"
                );
            }
            removed
        })
        .sum()
}
