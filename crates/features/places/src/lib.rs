//! Places feature slice.
//!
//! Reconciles nearby venues from two disagreeing providers — a third-party
//! places search (authoritative for discovery) and the persisted store
//! (authoritative for tags) — and keeps the merged marker set live through
//! the store's change feed. See [`PlacesSession`] for the entry point.

mod codec;
mod error;
pub mod filter;
mod gateway;
mod livesync;
mod query;
mod reconcile;
pub mod reducer;
#[cfg(feature = "server")]
mod router;
mod session;
mod store;
mod surreal;

pub use codec::{marker_from_external, seeded_marker_id};
pub use error::{PlacesError, PlacesErrorExt};
pub use gateway::{ExternalPlace, ExternalPlaces, HttpPlacesGateway};
pub use query::execute_query;
pub use reconcile::reconcile;
#[cfg(feature = "server")]
pub use router::location_router;
pub use session::{EpochStarted, MarkersChanged, PlacesSession};
pub use store::{MarkerStore, Subscription};
pub use surreal::SurrealMarkerStore;

#[cfg(feature = "server")]
use nosh_database::Database;
#[cfg(feature = "server")]
use nosh_domain::config::ApiConfig;
#[cfg(feature = "server")]
use nosh_domain::registry::InitializedSlice;

/// Places feature state
#[nosh_derive::nosh_slice]
pub struct Places {
    pub store: SurrealMarkerStore,
    pub query_limit: usize,
}

/// Initialize the places feature.
///
/// # Errors
/// Currently infallible; kept fallible for parity with the other slices.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig, database: &Database) -> Result<InitializedSlice, PlacesError> {
    tracing::info!("Places server slice initialized");

    let inner = PlacesInner {
        store: SurrealMarkerStore::new(database.clone()),
        query_limit: config.places.query_limit,
    };

    let slice = Places::new(inner);

    Ok(InitializedSlice::new(slice))
}
