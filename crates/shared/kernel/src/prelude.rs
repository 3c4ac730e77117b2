//! Convenience re-exports for consumers of the kernel.

pub use crate::safe_nanoid;
pub use crate::snapshot::{KeyValue, Recovery, Snapshot, SnapshotCache, StorageKeyValue};

#[cfg(feature = "server")]
pub use crate::server::{ApiState, ApiStateBuilder};
