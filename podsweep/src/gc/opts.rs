use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::runtime::conf::conf_serde::duration;

/// Delay between a pod's deletion and the removal of its metric series.
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_secs(60);

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PodGcOptions {
    /// Remove the metric series of deleted pods.
    pub enabled: bool,
    /// How long a deleted pod's series stay exposed before removal, giving
    /// scrapers a chance to collect their final values.
    #[serde(with = "duration")]
    pub delete_delay: Duration,
}

impl Default for PodGcOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            delete_delay: DEFAULT_DELETE_DELAY,
        }
    }
}
