//! Pod delete notifications delivered by the informer.

use k8s_openapi::api::core::v1::Pod;

/// Payload of a pod delete callback.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteNotification {
    /// The watch observed the deletion of this pod.
    Pod(Box<Pod>),
    /// The watch missed the deletion (e.g. a lost apiserver connection) and
    /// a later re-list found the pod gone. `obj` is the last known state of
    /// the pod, when there is one.
    DeletedFinalStateUnknown { key: String, obj: Option<Box<Pod>> },
    /// Any other object. Ignored by handlers.
    Unrecognized { kind: String },
}

/// Receives pod delete notifications from an informer.
///
/// Called from the informer's task; implementations must not block.
pub trait PodDeleteHandler: Send + Sync {
    fn on_delete(&self, notification: DeleteNotification);
}
