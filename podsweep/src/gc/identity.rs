use std::fmt;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;

/// Name and namespace of a pod, as carried by the `pod` and `namespace`
/// metric labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PodIdentity {
    pub name: String,
    pub namespace: String,
}

impl PodIdentity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Extracts the identity of `pod`. Returns `None` when the object has no
    /// name or no namespace.
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.as_deref().filter(|n| !n.is_empty())?;
        let namespace = pod.namespace().filter(|ns| !ns.is_empty())?;
        Some(Self::new(name, namespace))
    }
}

impl fmt::Display for PodIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
