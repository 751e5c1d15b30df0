pub mod client;
pub mod error;
pub mod informer;
pub mod notification;
pub mod opts;

pub use error::K8sError;
pub use notification::{DeleteNotification, PodDeleteHandler};
pub use informer::{PodTracker, run_pod_informer};
