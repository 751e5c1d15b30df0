use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct K8sOptions {
    /// Watch pods in the cluster. Without it no pod deletion is ever observed.
    pub enabled: bool,
}

impl Default for K8sOptions {
    fn default() -> Self {
        Self { enabled: true }
    }
}
