use kube::Client;
use tracing::debug;

use crate::k8s::error::K8sError;

/// Creates the Kubernetes client from the kubeconfig or the in-cluster
/// environment. Returns `None` without touching either when `watch_pods` is
/// false.
pub async fn connect(watch_pods: bool) -> Result<Option<Client>, K8sError> {
    if !watch_pods {
        return Ok(None);
    }

    let client = Client::try_default()
        .await
        .map_err(K8sError::client_initialization)?;
    debug!(
        event.name = "k8s.client.connected",
        k8s.namespace.name = %client.default_namespace(),
        "kubernetes client initialized"
    );
    Ok(Some(client))
}
