//! Reference data feature slice.
//!
//! Owns the food category and dietary condition catalogs: durable snapshots
//! under the 6-hour freshness window, incremental catch-up against the store,
//! and live feeds for ongoing updates.

mod catalog;
mod error;
mod store;

pub use catalog::{ReferenceCatalog, ReferenceUpdated};
pub use error::{ReferenceError, ReferenceErrorExt};
pub use store::{FeedGuard, RefChange, RefRecord, ReferenceStore, SurrealReferenceStore};

#[cfg(feature = "server")]
use nosh_database::Database;
#[cfg(feature = "server")]
use nosh_domain::registry::InitializedSlice;
#[cfg(feature = "server")]
use nosh_event_bus::EventBus;
#[cfg(feature = "server")]
use nosh_kernel::snapshot::SnapshotCache;

/// Reference feature state
#[nosh_derive::nosh_slice]
pub struct Reference {
    pub catalog: ReferenceCatalog,
}

/// Initialize the reference feature.
///
/// # Errors
/// Returns an error if the initial catalog catch-up fails.
#[cfg(feature = "server")]
pub async fn init(
    database: &Database,
    cache: SnapshotCache,
    events: &EventBus,
) -> Result<InitializedSlice, ReferenceError> {
    let store = std::sync::Arc::new(SurrealReferenceStore::new(database.clone()));
    let catalog = ReferenceCatalog::new(store, cache, events.clone());
    catalog.start().await?;

    tracing::info!("Reference server slice initialized");

    let slice = Reference::new(ReferenceInner { catalog });

    Ok(InitializedSlice::new(slice))
}
