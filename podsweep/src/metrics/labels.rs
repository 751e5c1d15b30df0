//! Constants for metric labels.

// Pod identity labels. Every vector in the pod-labeled set carries both.
pub const POD: &str = "pod";
pub const NAMESPACE: &str = "namespace";

// Other dimensions of the pod-labeled vectors
pub const BINARY: &str = "binary";
pub const EVENT_TYPE: &str = "type";
pub const SYSCALL: &str = "syscall";

// Ignored delete notification reasons
pub const IGNORED_EMPTY_TOMBSTONE: &str = "empty_tombstone";
pub const IGNORED_UNRECOGNIZED: &str = "unrecognized";
pub const IGNORED_MISSING_IDENTITY: &str = "missing_identity";
