//! One query epoch: a paired fetch against both providers.

use crate::error::PlacesError;
use crate::gateway::{ExternalPlace, ExternalPlaces};
use crate::store::MarkerStore;
use nosh_domain::geo::GeoPoint;
use nosh_domain::marker::Marker;
use std::sync::Arc;
use tracing::warn;

/// Issues the external search and the authoritative radius query
/// concurrently and awaits both.
///
/// The external fetch is best-effort: any failure (including a non-OK
/// provider status) degrades to an empty result, is never retried, and never
/// surfaces past this function. The authoritative store remains the system of
/// record, so its failure is a real error.
///
/// Neither result set carries an ordering guarantee.
///
/// # Errors
/// Returns [`PlacesError::Store`] when the authoritative query fails.
pub async fn execute_query(
    gateway: &Arc<dyn ExternalPlaces>,
    store: &Arc<dyn MarkerStore>,
    center: GeoPoint,
    radius_m: f64,
    category: &str,
    limit: usize,
) -> Result<(Vec<ExternalPlace>, Vec<Marker>), PlacesError> {
    let (external, authoritative) = tokio::join!(
        gateway.search(center, radius_m, category),
        store.query_near(center, radius_m, limit),
    );

    let external = external.unwrap_or_else(|err| {
        warn!(error = %err, "External search degraded to empty result");
        Vec::new()
    });

    Ok((external, authoritative?))
}
